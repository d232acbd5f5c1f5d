//! Rectangular sweep tables and their delimited-text persistence.
//!
//! A [`Table`] is an ordered sequence of rows sharing one column set. On disk it is a CSV file whose first
//! line holds the column names. Tables are written either all at once ([`Table::write_csv`]) or one row at a
//! time as a sweep progresses ([`TableWriter`]), so that a failure late in a sweep keeps the rows collected
//! before it.

use crate::{Record, Value};
use std::{
    fmt,
    fs::File,
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

//==============
// Errors

#[derive(Debug, Error)]
pub enum TableError {
    #[error("{path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: expected {expected} fields but found {found}")]
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: value `{value}` in column `{column}` is not {expected}")]
    ParseValue {
        line: u64,
        column: String,
        value: String,
        expected: ColumnKind,
    },

    #[error("column `{column}` needs {expected} values but got {found}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("no column named `{column}`")]
    MissingColumn { column: String },

    #[error("column `{column}` appears more than once")]
    DuplicateColumn { column: String },

    #[error("record fields {found:?} do not match table columns {expected:?}")]
    FieldMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

//=================
// Schema

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColumnKind::Int => "an integer",
            ColumnKind::Float => "a number",
            ColumnKind::Text => "text",
        })
    }
}

impl ColumnKind {
    fn parse(self, raw: &str) -> Option<Value> {
        if raw.is_empty() {
            return Some(Value::Missing);
        }
        match self {
            ColumnKind::Int => raw.parse().ok().map(Value::Int),
            ColumnKind::Float => raw.parse().ok().map(Value::Float),
            ColumnKind::Text => Some(Value::Text(raw.to_owned())),
        }
    }

    /// Narrowest kind that accepts every non-empty cell.
    fn infer<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> Self {
        let mut non_empty = cells.filter(|c| !c.is_empty());
        if non_empty.clone().all(|c| c.parse::<i64>().is_ok()) {
            ColumnKind::Int
        } else if non_empty.all(|c| c.parse::<f64>().is_ok()) {
            ColumnKind::Float
        } else {
            ColumnKind::Text
        }
    }
}

/// Declared column kinds, used to validate a table on load.
///
/// Columns not named by the schema are inferred.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    columns: Vec<(String, ColumnKind)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.columns.push((name.into(), kind));
        self
    }

    pub fn int(self, name: impl Into<String>) -> Self {
        self.column(name, ColumnKind::Int)
    }

    pub fn float(self, name: impl Into<String>) -> Self {
        self.column(name, ColumnKind::Float)
    }

    pub fn text(self, name: impl Into<String>) -> Self {
        self.column(name, ColumnKind::Text)
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, k)| *k)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }
}

//=================
// Table

/// Ordered rows of [`Value`]s under a fixed list of column names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Empty table with the given columns.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Result<Self, TableError> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        check_unique(&columns)?;
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Builds a table whose columns follow the field order of the first record.
    pub fn from_records(records: &[Record]) -> Result<Self, TableError> {
        let mut table = match records.first() {
            Some(first) => Table::new(first.names())?,
            None => Table::default(),
        };
        for rec in records {
            table.push(rec)?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TableError::MissingColumn {
                column: name.to_owned(),
            })
    }

    /// Appends `record`, whose field names must be exactly the table's columns (in any order).
    pub fn push(&mut self, record: &Record) -> Result<(), TableError> {
        let row = align(&self.columns, record)?;
        self.rows.push(row);
        Ok(())
    }

    /// Rows as [`Record`]s, in table order.
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.rows.iter().map(|row| {
            self.columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect()
        })
    }

    /// Cells of column `name`, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>, TableError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Numeric cells of column `name`; missing and non-numeric cells are skipped.
    pub fn numbers(&self, name: &str) -> Result<Vec<f64>, TableError> {
        Ok(self
            .column(name)?
            .into_iter()
            .filter_map(Value::as_f64)
            .collect())
    }

    /// `(x, y)` pairs for rows where both cells are numeric, in row order.
    pub fn pairs_f64(&self, x: &str, y: &str) -> Result<Vec<(f64, f64)>, TableError> {
        let xi = self.column_index(x)?;
        let yi = self.column_index(y)?;
        Ok(self
            .rows
            .iter()
            .filter_map(|row| Some((row[xi].as_f64()?, row[yi].as_f64()?)))
            .collect())
    }

    /// Adds column `name` with `values`, or replaces its cells if it already exists.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::ColumnLength {
                column: name.to_owned(),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        match self.columns.iter().position(|c| c == name) {
            Some(idx) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                self.columns.push(name.to_owned());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(())
    }

    /// Renames every column with `f`.
    pub fn rename_columns(&mut self, f: impl Fn(&str) -> String) -> Result<(), TableError> {
        let renamed: Vec<String> = self.columns.iter().map(|c| f(c.as_str())).collect();
        check_unique(&renamed)?;
        self.columns = renamed;
        Ok(())
    }

    /// Re-types the cells of every column declared in `schema`, e.g. after a table read with inferred
    /// kinds has had its columns renamed. Declared columns absent from the table are ignored.
    ///
    /// # Errors
    /// [`TableError::ParseValue`] for the first cell that does not parse as its declared kind. Its line
    /// counts the header as line 1 and assumes one line per row.
    pub fn conform(&mut self, schema: &Schema) -> Result<(), TableError> {
        for (idx, column) in self.columns.iter().enumerate() {
            let Some(kind) = schema.kind_of(column) else {
                continue;
            };
            for (row, cells) in self.rows.iter_mut().enumerate() {
                let raw = cells[idx].to_string();
                cells[idx] = kind.parse(&raw).ok_or_else(|| TableError::ParseValue {
                    line: row as u64 + 2,
                    column: column.clone(),
                    value: raw.clone(),
                    expected: kind,
                })?;
            }
        }
        Ok(())
    }

    /// Rows whose `column` cell equals `value`, preserving relative order.
    pub fn filter_eq(&self, column: &str, value: &Value) -> Result<Table, TableError> {
        let idx = self.column_index(column)?;
        Ok(Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| row[idx] == *value)
                .cloned()
                .collect(),
        })
    }

    /// Splits the table by the distinct values of `column`, in order of first appearance.
    pub fn group_by(&self, column: &str) -> Result<Vec<(Value, Table)>, TableError> {
        let idx = self.column_index(column)?;
        let mut keys = Vec::<Value>::new();
        for row in &self.rows {
            if !keys.contains(&row[idx]) {
                keys.push(row[idx].clone());
            }
        }
        keys.into_iter()
            .map(|k| {
                let group = self.filter_eq(column, &k)?;
                Ok((k, group))
            })
            .collect()
    }

    //-----------------
    // Persistence

    /// Writes the header line followed by every row.
    pub fn write_to<W: io::Write>(&self, w: W) -> Result<(), TableError> {
        let path = "<writer>";
        let mut wtr = csv::Writer::from_writer(w);
        write_row(&mut wtr, path, self.columns.iter().map(String::as_str))?;
        for row in &self.rows {
            write_row(&mut wtr, path, row.iter().map(ToString::to_string))?;
        }
        wtr.flush().map_err(|source| io_err(path, source))
    }

    /// Replaces the file at `path` with this table.
    ///
    /// # Errors
    /// [`TableError::Csv`] or [`TableError::Io`] if `path` cannot be created or written, e.g. because its
    /// parent directory does not exist.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), TableError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| io_err(path.display(), source))?;
        self.write_to(file).map_err(|e| relabel(e, path))
    }

    /// Reads a table, inferring every column's kind.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self, TableError> {
        Self::read_csv_with_schema(path, &Schema::default())
    }

    /// Reads a table, enforcing the kinds declared in `schema`.
    pub fn read_csv_with_schema(path: impl AsRef<Path>, schema: &Schema) -> Result<Self, TableError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| io_err(path.display(), source))?;
        Self::from_reader(file, schema).map_err(|e| relabel(e, path))
    }

    /// Parses a table from `r`.
    ///
    /// A leading column with an empty name (a row index written by dataframe tools) is dropped.
    ///
    /// # Errors
    /// - [`TableError::FieldCount`] if a line's field count differs from the header's.
    /// - [`TableError::ParseValue`] if a cell does not parse as the kind declared in `schema`.
    /// - [`TableError::MissingColumn`] if `schema` names a column absent from the header.
    pub fn from_reader<R: io::Read>(r: R, schema: &Schema) -> Result<Self, TableError> {
        let path = "<reader>";
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(r);

        let headers = rdr.headers().map_err(|source| csv_err(path, source))?.clone();
        let skip_index = headers.get(0).is_some_and(str::is_empty);
        let columns: Vec<String> = headers
            .iter()
            .skip(skip_index as usize)
            .map(str::to_owned)
            .collect();
        check_unique(&columns)?;
        if let Some(missing) = schema.names().find(|n| !columns.iter().any(|c| c == n)) {
            return Err(TableError::MissingColumn {
                column: missing.to_owned(),
            });
        }

        let mut raw = Vec::<(u64, Vec<String>)>::new();
        for result in rdr.records() {
            let rec = result.map_err(|source| csv_err(path, source))?;
            let line = rec.position().map_or(0, |p| p.line());
            if rec.len() != headers.len() {
                return Err(TableError::FieldCount {
                    line,
                    expected: headers.len(),
                    found: rec.len(),
                });
            }
            let cells = rec
                .iter()
                .skip(skip_index as usize)
                .map(str::to_owned)
                .collect();
            raw.push((line, cells));
        }

        let kinds: Vec<ColumnKind> = columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                schema.kind_of(name).unwrap_or_else(|| {
                    ColumnKind::infer(raw.iter().map(move |(_, cells)| cells[i].as_str()))
                })
            })
            .collect();

        let mut rows = Vec::with_capacity(raw.len());
        for (line, cells) in raw {
            let row = cells
                .into_iter()
                .zip(&kinds)
                .zip(&columns)
                .map(|((cell, kind), column)| {
                    kind.parse(&cell).ok_or_else(|| TableError::ParseValue {
                        line,
                        column: column.clone(),
                        value: cell.clone(),
                        expected: *kind,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }

        log::debug!("loaded table with columns {columns:?} and {} rows", rows.len());
        Ok(Self { columns, rows })
    }
}

//=================
// TableWriter

/// Destination for the records produced by a sweep, one record per successful grid point.
pub trait RecordSink {
    fn accept(&mut self, record: &Record) -> Result<(), TableError>;
}

impl RecordSink for Vec<Record> {
    fn accept(&mut self, record: &Record) -> Result<(), TableError> {
        self.push(record.clone());
        Ok(())
    }
}

impl RecordSink for Table {
    fn accept(&mut self, record: &Record) -> Result<(), TableError> {
        self.push(record)
    }
}

/// Incremental CSV writer: the header is written on creation and each appended record is flushed
/// immediately, so the file always holds every row accepted so far.
pub struct TableWriter {
    path: PathBuf,
    columns: Vec<String>,
    wtr: csv::Writer<File>,
    rows: usize,
}

impl TableWriter {
    /// Creates (or truncates) the file at `path` and writes the header line.
    pub fn create<S: Into<String>>(
        path: impl AsRef<Path>,
        columns: impl IntoIterator<Item = S>,
    ) -> Result<Self, TableError> {
        let path = path.as_ref().to_path_buf();
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        check_unique(&columns)?;

        let file = File::create(&path).map_err(|source| io_err(path.display(), source))?;
        let mut wtr = csv::Writer::from_writer(file);
        write_row(&mut wtr, path.display(), columns.iter().map(String::as_str))?;
        wtr.flush().map_err(|source| io_err(path.display(), source))?;

        Ok(Self {
            path,
            columns,
            wtr,
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn append(&mut self, record: &Record) -> Result<(), TableError> {
        let row = align(&self.columns, record)?;
        write_row(&mut self.wtr, self.path.display(), row.iter().map(ToString::to_string))?;
        self.wtr
            .flush()
            .map_err(|source| io_err(self.path.display(), source))?;
        self.rows += 1;
        Ok(())
    }
}

impl RecordSink for TableWriter {
    fn accept(&mut self, record: &Record) -> Result<(), TableError> {
        self.append(record)
    }
}

//=================
// Helpers

fn check_unique(columns: &[String]) -> Result<(), TableError> {
    for (i, c) in columns.iter().enumerate() {
        if columns[..i].contains(c) {
            return Err(TableError::DuplicateColumn { column: c.clone() });
        }
    }
    Ok(())
}

/// Orders the fields of `record` by `columns`.
fn align(columns: &[String], record: &Record) -> Result<Vec<Value>, TableError> {
    let mismatch = || TableError::FieldMismatch {
        expected: columns.to_vec(),
        found: record.names().map(str::to_owned).collect(),
    };
    if record.len() != columns.len() {
        return Err(mismatch());
    }
    columns
        .iter()
        .map(|c| record.get(c).cloned().ok_or_else(mismatch))
        .collect()
}

fn write_row<W, I, T>(wtr: &mut csv::Writer<W>, path: impl fmt::Display, cells: I) -> Result<(), TableError>
where
    W: io::Write,
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    wtr.write_record(cells).map_err(|source| csv_err(path, source))
}

fn csv_err(path: impl fmt::Display, source: csv::Error) -> TableError {
    TableError::Csv {
        path: path.to_string(),
        source,
    }
}

fn io_err(path: impl fmt::Display, source: io::Error) -> TableError {
    TableError::Io {
        path: path.to_string(),
        source,
    }
}

/// Replaces the placeholder location of reader/writer errors with the file path.
fn relabel(e: TableError, path: &Path) -> TableError {
    match e {
        TableError::Csv { source, .. } => csv_err(path.display(), source),
        TableError::Io { source, .. } => io_err(path.display(), source),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_picks_narrowest_kind() {
        let text = "schedule,chunk,time,note\nstatic,1,0.45,\nguided,5,2.0,x\n";
        let table = Table::from_reader(text.as_bytes(), &Schema::default()).unwrap();
        assert_eq!(
            table.rows()[1],
            vec![
                Value::Text("guided".into()),
                Value::Int(5),
                Value::Float(2.0),
                Value::Text("x".into())
            ]
        );
        assert_eq!(table.rows()[0][3], Value::Missing);
    }

    #[test]
    fn group_by_keeps_first_appearance_order() {
        let text = "schedule,chunk\nguided,1\nstatic,1\nguided,5\n";
        let table = Table::from_reader(text.as_bytes(), &Schema::default()).unwrap();
        let groups = table.group_by("schedule").unwrap();
        let keys: Vec<_> = groups.iter().map(|(k, t)| (k.to_string(), t.len())).collect();
        assert_eq!(keys, vec![("guided".to_owned(), 2), ("static".to_owned(), 1)]);
    }
}
