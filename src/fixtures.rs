//! Test data: a small events CSV and a matching SQLite database.

use std::io::Write;
use std::path::Path;

use rusqlite::{params, Connection};
use tempfile::NamedTempFile;

pub const SAMPLE_EVENT_COUNT: usize = 7;

// Rows are deliberately out of year order.
const SAMPLE_CSV: &str = "\
type,year,country,host,start,end,countries,events,sports,participants_m,participants_f,participants,highlights
summer,2016,Brazil,Rio de Janeiro,07/09/2016,18/09/2016,159,528,22,2657,1671,4328,First Paralympics in South America
summer,1960,Italy,Rome,18/09/1960,25/09/1960,23,57,8,,,209,First Paralympic Games
winter,1994,Norway,Lillehammer,10/03/1994,19/03/1994,31,133,5,381,88,471,Sledge hockey debuts
summer,1992,Spain,Barcelona,03/09/1992,14/09/1992,83,487,16,2503,497,3001,Held in the same venues as the Olympics
winter,2022,China,Beijing,04/03/2022,13/03/2022,46,78,6,,,564,
summer,2012,UK,London,29/08/2012,09/09/2012,164,503,20,2736,1501,4237,Record ticket sales
winter,1976,Sweden,Ornskoldsvik,21/02/1976,28/02/1976,16,53,2,159,37,196,First Winter Paralympics
";

// host, year, latitude, longitude
const SAMPLE_LOCATIONS: [(&str, i32, &str, &str); SAMPLE_EVENT_COUNT] = [
    ("Rio de Janeiro", 2016, "-22.9068", "-43.1729"),
    ("Rome", 1960, "41.9028", "12.4964"),
    ("Lillehammer", 1994, "61.1153", "10.4662"),
    ("Barcelona", 1992, "41.3874", "2.1686"),
    ("Beijing", 2022, "39.9042", "116.4074"),
    ("London", 2012, "51.5072", "-0.1276"),
    ("Ornskoldsvik", 1976, "63.2909", "18.7153"),
];

const SCHEMA: &str = "
    CREATE TABLE event (
        event_id INTEGER PRIMARY KEY,
        type TEXT NOT NULL,
        year INTEGER NOT NULL,
        country TEXT,
        start TEXT,
        \"end\" TEXT,
        countries INTEGER,
        events INTEGER,
        sports INTEGER,
        participants_m REAL,
        participants_f REAL,
        participants REAL,
        highlights TEXT
    );
    CREATE TABLE host (
        host_id INTEGER PRIMARY KEY,
        host TEXT NOT NULL,
        latitude TEXT,
        longitude TEXT
    );
    CREATE TABLE host_event (
        host_event_id INTEGER PRIMARY KEY,
        host_id INTEGER NOT NULL REFERENCES host(host_id),
        event_id INTEGER NOT NULL REFERENCES event(event_id)
    );
";

pub fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn sample_csv() -> NamedTempFile {
    write_csv(SAMPLE_CSV)
}

/// Schema only, no rows.
pub fn empty_db() -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    file
}

/// Same events as [`sample_csv`], with coordinates stored as text and
/// participant counts as REAL (the columns have gaps).
pub fn sample_db() -> NamedTempFile {
    let file = empty_db();
    let mut conn = Connection::open(file.path()).unwrap();
    let tx = conn.transaction().unwrap();

    let mut reader = csv::Reader::from_reader(SAMPLE_CSV.as_bytes());
    for (idx, row) in reader.records().enumerate() {
        let row = row.unwrap();
        let id = idx as i64 + 1;
        let opt = |i: usize| Some(&row[i]).filter(|v| !v.is_empty());
        tx.execute(
            "INSERT INTO event (event_id, type, year, country, start, \"end\", countries, events,
                                sports, participants_m, participants_f, participants, highlights)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                id,
                &row[0],
                row[1].parse::<i32>().unwrap(),
                &row[2],
                &row[4],
                &row[5],
                opt(6).map(|v| v.parse::<i64>().unwrap()),
                opt(7).map(|v| v.parse::<i64>().unwrap()),
                opt(8).map(|v| v.parse::<i64>().unwrap()),
                opt(9).map(|v| v.parse::<i64>().unwrap()),
                opt(10).map(|v| v.parse::<i64>().unwrap()),
                opt(11).map(|v| v.parse::<i64>().unwrap()),
                opt(12),
            ],
        )
        .unwrap();

        let (host, year, lat, lon) = SAMPLE_LOCATIONS[idx];
        assert_eq!((host, year.to_string().as_str()), (&row[3], &row[1]));
        tx.execute(
            "INSERT INTO host (host_id, host, latitude, longitude) VALUES (?1, ?2, ?3, ?4)",
            params![id, host, lat, lon],
        )
        .unwrap();
        tx.execute(
            "INSERT INTO host_event (host_id, event_id) VALUES (?1, ?1)",
            params![id],
        )
        .unwrap();
    }

    tx.commit().unwrap();
    file
}

/// Links the event for (`host`, `year`) to a second host row with the same
/// name, so the join yields two rows.
pub fn duplicate_host_link(db: &Path, host: &str, year: i32) {
    let conn = Connection::open(db).unwrap();
    conn.execute(
        "INSERT INTO host (host, latitude, longitude) VALUES (?1, '0', '0')",
        params![host],
    )
    .unwrap();
    let host_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO host_event (host_id, event_id) SELECT ?1, event_id FROM event WHERE year = ?2",
        params![host_id, year],
    )
    .unwrap();
}

/// Runs a statement against a fixture database.
pub fn execute(db: &Path, sql: &str) {
    let conn = Connection::open(db).unwrap();
    conn.execute_batch(sql).unwrap();
}
