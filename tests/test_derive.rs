use mc_sweep::{derive_ratios, Ratio, Record, Table, TableError, Undefined, Value};

mod common;
use common::are_close;

fn timings() -> Table {
    Table::from_records(&[
        Record::new().with("iteration", 400).with("serial", 10.0).with("parallel", 5.0),
        Record::new().with("iteration", 600).with("serial", 20.0).with("parallel", 4.0),
    ])
    .unwrap()
}

#[test]
fn test_speedup_column_is_appended() {
    let mut table = timings();
    let undefined = derive_ratios(&mut table, &[Ratio::new("serial", "parallel", "speedup")]).unwrap();

    assert!(undefined.is_empty());
    assert_eq!(table.columns(), ["iteration", "serial", "parallel", "speedup"]);
    assert_eq!(table.numbers("speedup").unwrap(), vec![2.0, 5.0]);
    assert_eq!(table.numbers("serial").unwrap(), vec![10.0, 20.0]);
    assert_eq!(table.numbers("parallel").unwrap(), vec![5.0, 4.0]);
}

#[test]
fn test_derivation_replaces_an_existing_result() {
    let mut table = timings();
    let ratio = Ratio::new("parallel", "serial", "speedup");
    derive_ratios(&mut table, &[ratio.clone()]).unwrap();
    derive_ratios(&mut table, &[ratio]).unwrap();

    assert_eq!(table.columns().len(), 4);
    let speedup = table.numbers("speedup").unwrap();
    assert!(are_close(speedup[0], 0.5, 1e-12));
    assert!(are_close(speedup[1], 0.2, 1e-12));
}

#[test]
fn test_zero_denominator_leaves_cell_missing() {
    let mut table = Table::from_records(&[
        Record::new().with("serial", 3.0).with("parallel", 0.0),
        Record::new().with("serial", 3.0).with("parallel", 1.5),
    ])
    .unwrap();

    let undefined = derive_ratios(&mut table, &[Ratio::new("serial", "parallel", "speedup")]).unwrap();

    assert_eq!(table.column("speedup").unwrap(), vec![&Value::Missing, &Value::Float(2.0)]);
    assert_eq!(undefined.len(), 1);
    assert_eq!((undefined[0].row, undefined[0].reason), (0, Undefined::ZeroDenominator));
}

#[test]
fn test_missing_source_column_is_an_error() {
    let mut table = timings();
    let err = derive_ratios(&mut table, &[Ratio::new("serial", "time_mpi_8n", "speedup")]).unwrap_err();
    assert!(matches!(err, TableError::MissingColumn { column } if column == "time_mpi_8n"));
    assert!(!table.has_column("speedup"));
}
