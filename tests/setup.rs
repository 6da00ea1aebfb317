#![allow(dead_code)]

use std::sync::Arc;

use dbmock::error::Result;
use dbmock::{Config, Connection, Server};

/// The movie database schema.
pub const MOVIES_SCHEMA: &str = "
    CREATE TABLE genres (
        id INTEGER PRIMARY KEY,
        name STRING NOT NULL UNIQUE
    );
    CREATE TABLE movies (
        id INTEGER PRIMARY KEY AUTO_INCREMENT,
        title VARCHAR(255) NOT NULL,
        genre_id INTEGER NOT NULL,
        released INTEGER NOT NULL,
        rating FLOAT,
        ultrahd BOOLEAN DEFAULT FALSE
    );
";

/// The movie database rows.
pub const MOVIES_DATA: [&str; 2] = [
    "INSERT INTO genres VALUES (1, 'Science Fiction'), (2, 'Action'), (3, 'Comedy')",
    "INSERT INTO movies (title, genre_id, released, rating, ultrahd) VALUES
        ('Stalker', 1, 1979, 8.2, NULL),
        ('Sicario', 2, 2015, 7.6, TRUE),
        ('Primer', 1, 2004, 6.9, NULL),
        ('Heat', 2, 1995, 8.2, TRUE),
        ('The Fountain', 1, 2006, 7.2, FALSE),
        ('Solaris', 1, 1972, 8.1, NULL),
        ('Gravity', 1, 2013, 7.7, TRUE),
        ('Blindspotting', 3, 2018, 7.4, TRUE),
        ('Birdman', 3, 2014, 7.7, TRUE),
        ('Inception', 1, 2010, 8.8, TRUE)",
];

/// Sets up a server with the movie database loaded into database "movies",
/// and returns a connection to it.
pub fn movies(config: Config) -> Result<Connection> {
    let server = Arc::new(Server::new("movies", config));
    server.load_schema("movies", MOVIES_SCHEMA)?;
    let conn = Server::connect(&server, "movies");
    for sql in MOVIES_DATA {
        conn.query(sql)?;
    }
    Ok(conn)
}

/// Runs a query and returns its rows as strings of comma-separated values.
pub fn rows(conn: &Connection, sql: &str) -> Result<Vec<String>> {
    Ok(conn
        .query(sql)?
        .into_rows()
        .into_iter()
        .map(|row| row.values().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))
        .collect())
}
