use mc_sweep::{ColumnKind, Record, Schema, Table, TableError, TableWriter, Value};
use std::{fs, io::Cursor};

fn sample() -> Table {
    Table::from_records(&[
        Record::new().with("schedule", "static").with("chunk", 1).with("time", 0.5),
        Record::new().with("schedule", "dynamic").with("chunk", 1).with("time", 0.25),
        Record::new().with("schedule", "static").with("chunk", 5).with("time", 1.0),
    ])
    .unwrap()
}

#[test]
fn test_write_then_read_preserves_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schedule.csv");
    let table = sample();

    table.write_csv(&path).unwrap();
    let loaded = Table::read_csv(&path).unwrap();

    assert_eq!(loaded, table);
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("schedule,chunk,time\n"));
    assert!(text.contains("dynamic,1,0.25\n"));
    // Whole floats keep their decimal point so the column stays Float.
    assert!(text.contains("static,5,1.0\n"));
}

#[test]
fn test_missing_cells_round_trip_as_empty() {
    let mut table = Table::new(["iteration", "speedup"]).unwrap();
    table
        .push(&Record::new().with("iteration", 400).with("speedup", Value::Missing))
        .unwrap();
    table
        .push(&Record::new().with("speedup", 2.5).with("iteration", 600))
        .unwrap();

    let mut buf = Vec::new();
    table.write_to(&mut buf).unwrap();
    assert_eq!(String::from_utf8(buf.clone()).unwrap(), "iteration,speedup\n400,\n600,2.5\n");

    let loaded = Table::from_reader(Cursor::new(buf), &Schema::default()).unwrap();
    assert_eq!(loaded.column("speedup").unwrap(), vec![&Value::Missing, &Value::Float(2.5)]);
}

#[test]
fn test_field_count_mismatch_is_rejected() {
    let csv = "threads,time\n1,0.5\n2,0.4,9\n";
    let err = Table::from_reader(csv.as_bytes(), &Schema::default()).unwrap_err();
    assert!(
        matches!(err, TableError::FieldCount { line: 3, expected: 2, found: 3 }),
        "{err:?}"
    );
}

#[test]
fn test_schema_is_enforced() {
    let csv = "threads,time\n1,0.5\ntwo,0.4\n";
    let schema = Schema::new().int("threads").float("time");
    let err = Table::from_reader(csv.as_bytes(), &schema).unwrap_err();
    match err {
        TableError::ParseValue { line, column, value, expected } => {
            assert_eq!((line, column.as_str(), value.as_str(), expected), (3, "threads", "two", ColumnKind::Int));
        }
        other => panic!("unexpected error {other:?}"),
    }

    let missing = Table::from_reader("time\n0.5\n".as_bytes(), &schema).unwrap_err();
    assert!(matches!(missing, TableError::MissingColumn { column } if column == "threads"));
}

#[test]
fn test_kinds_are_inferred() {
    let csv = "a,b,c,d\n1,1.5,x,\n2,2,y,\n";
    let table = Table::from_reader(csv.as_bytes(), &Schema::default()).unwrap();
    assert_eq!(
        table.rows()[1],
        vec![Value::Int(2), Value::Float(2.0), Value::from("y"), Value::Missing]
    );
}

#[test]
fn test_leading_index_column_is_dropped() {
    let csv = ",Day,Mean\n0,1,100.5\n1,2,101.25\n";
    let table = Table::from_reader(csv.as_bytes(), &Schema::default()).unwrap();
    assert_eq!(table.columns(), ["Day", "Mean"]);
    assert_eq!(table.pairs_f64("Day", "Mean").unwrap(), vec![(1.0, 100.5), (2.0, 101.25)]);
}

#[test]
fn test_filter_and_group_preserve_order() {
    let table = sample();

    let statics = table.filter_eq("schedule", &Value::from("static")).unwrap();
    assert_eq!(statics.numbers("chunk").unwrap(), vec![1.0, 5.0]);

    let groups = table.group_by("schedule").unwrap();
    let keys: Vec<_> = groups.iter().map(|(k, g)| (k.to_string(), g.len())).collect();
    assert_eq!(keys, vec![("static".to_owned(), 2), ("dynamic".to_owned(), 1)]);

    assert!(matches!(
        table.filter_eq("nope", &Value::Missing),
        Err(TableError::MissingColumn { .. })
    ));
}

#[test]
fn test_writer_flushes_each_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("threads.csv");

    let mut writer = TableWriter::create(&path, ["threads", "time"]).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "threads,time\n");

    writer.append(&Record::new().with("threads", 1).with("time", 0.5)).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "threads,time\n1,0.5\n");
    assert_eq!(writer.rows(), 1);

    let err = writer.append(&Record::new().with("threads", 2)).unwrap_err();
    assert!(matches!(err, TableError::FieldMismatch { .. }));
}

#[test]
fn test_writing_into_a_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent").join("t.csv");
    assert!(matches!(sample().write_csv(&path), Err(TableError::Io { .. })));
    assert!(matches!(
        TableWriter::create(&path, ["a"]),
        Err(TableError::Io { .. })
    ));
}
