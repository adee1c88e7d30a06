//! CSV adapter: Delimited batch input and output.
//!
//! Input must carry a header row containing the 13 field names exactly.
//! Additional columns are allowed and passed through to the output. Short
//! rows are read as-is; their absent cells are reported as unparseable. Integer
//! codes may be written as integral floats (`63.0`), as exported datasets
//! usually do.
//!
//! Output repeats every input column and appends `prediction` (0/1) and
//! `risk_percent` (probability x 100, one decimal). Rows that failed encoding
//! get empty prediction cells.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::application::BatchReport;
use crate::domain::{parse_code, Constraint, Field, PatientRecord, ValidationError, Violation};
use crate::ports::{RecordSource, RecordTable, ResultSink};
use crate::CardioriskError;

/// Name of the appended label column.
pub const PREDICTION_COLUMN: &str = "prediction";

/// Name of the appended risk column.
pub const RISK_COLUMN: &str = "risk_percent";

/// Reads a batch from CSV.
pub struct CsvRecordSource<R: Read> {
    reader: ::csv::Reader<R>,
}

impl CsvRecordSource<File> {
    /// Open a CSV file.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened.
    pub fn from_path(path: &Path) -> crate::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> CsvRecordSource<R> {
    #[must_use]
    pub fn from_reader(reader: R) -> Self {
        let reader = ::csv::ReaderBuilder::new()
            .trim(::csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        Self { reader }
    }
}

impl<R: Read> RecordSource for CsvRecordSource<R> {
    fn read_table(&mut self) -> crate::Result<RecordTable> {
        let headers: Vec<String> = self.reader.headers()?.iter().map(str::to_string).collect();

        let mut positions = [0usize; 13];
        let mut violations = Vec::new();
        for field in Field::ALL {
            match headers.iter().position(|h| h == field.name()) {
                Some(i) => positions[field as usize] = i,
                None => violations.push(Violation::new(field, Constraint::MissingColumn)),
            }
        }
        if !violations.is_empty() {
            tracing::debug!("Batch header is missing {} column(s)", violations.len());
        }
        ValidationError::check(std::mem::take(&mut violations))?;

        let mut rows = Vec::new();
        let mut records = Vec::new();
        for (i, result) in self.reader.records().enumerate() {
            let row = result?;
            let cells: Vec<String> = row.iter().map(str::to_string).collect();
            let cell = |field: Field| cells.get(positions[field as usize]).map_or("", String::as_str);

            if let Some(record) = parse_record(cell, i + 1, &mut violations) {
                records.push(record);
            }
            rows.push(cells);
        }

        ValidationError::check(violations)?;
        Ok(RecordTable {
            headers,
            rows,
            records,
        })
    }
}

fn parse_record<'a>(
    cell: impl Fn(Field) -> &'a str,
    row: usize,
    violations: &mut Vec<Violation>,
) -> Option<PatientRecord> {
    let before = violations.len();
    let mut codes = [0i64; 13];
    let mut oldpeak = 0.0;

    for field in Field::ALL {
        let raw = cell(field);
        let parsed = if field == Field::Oldpeak {
            match raw.parse::<f64>() {
                Ok(v) => {
                    oldpeak = v;
                    true
                }
                Err(_) => false,
            }
        } else {
            match parse_code(raw) {
                Some(v) => {
                    codes[field as usize] = v;
                    true
                }
                None => false,
            }
        };
        if !parsed {
            violations.push(Violation::new(
                field,
                Constraint::Unparseable {
                    row,
                    raw: raw.to_string(),
                },
            ));
        }
    }

    if violations.len() > before {
        return None;
    }

    let code = |field: Field| codes[field as usize];
    Some(PatientRecord {
        age: code(Field::Age),
        sex: code(Field::Sex),
        cp: code(Field::Cp),
        trestbps: code(Field::Trestbps),
        chol: code(Field::Chol),
        fbs: code(Field::Fbs),
        restecg: code(Field::Restecg),
        thalach: code(Field::Thalach),
        exang: code(Field::Exang),
        oldpeak,
        slope: code(Field::Slope),
        ca: code(Field::Ca),
        thal: code(Field::Thal),
    })
}

/// Writes scored batches as CSV.
pub struct CsvResultSink<W: Write> {
    writer: ::csv::Writer<W>,
}

impl CsvResultSink<File> {
    /// Create (or truncate) an output file.
    ///
    /// # Errors
    /// Returns error if the file cannot be created.
    pub fn from_path(path: &Path) -> crate::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> CsvResultSink<W> {
    #[must_use]
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: ::csv::WriterBuilder::new().flexible(true).from_writer(writer),
        }
    }

    /// Flush and return the underlying writer.
    ///
    /// # Errors
    /// Returns error if the final flush fails.
    pub fn into_inner(self) -> crate::Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| CardioriskError::Io(e.into_error()))
    }
}

impl<W: Write> ResultSink for CsvResultSink<W> {
    fn write_results(&mut self, table: &RecordTable, report: &BatchReport) -> crate::Result<()> {
        if table.rows.len() != report.len() {
            return Err(CardioriskError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "report has {} outcome(s) for {} row(s)",
                    report.len(),
                    table.rows.len()
                ),
            )));
        }

        let mut header = table.headers.clone();
        header.push(PREDICTION_COLUMN.to_string());
        header.push(RISK_COLUMN.to_string());
        self.writer.write_record(&header)?;

        for (cells, outcome) in table.rows.iter().zip(report.outcomes()) {
            let (label, risk) = match outcome {
                Ok(p) => (p.label.to_string(), format!("{:.1}", p.risk_percent())),
                Err(e) => {
                    tracing::warn!("Row {} not scored: {}", e.row + 1, e.failure);
                    (String::new(), String::new())
                }
            };
            self.writer
                .write_record(cells.iter().map(String::as_str).chain([label.as_str(), risk.as_str()]))?;
        }

        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::RiskService;
    use crate::domain::Schema;
    use crate::test_support::fixture_artifact;
    use std::sync::Arc;

    const HEADER: &str = "age,sex,cp,trestbps,chol,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal";

    fn read(input: &str) -> crate::Result<RecordTable> {
        CsvRecordSource::from_reader(input.as_bytes()).read_table()
    }

    #[test]
    fn test_reads_integral_float_codes() {
        let input = format!("{HEADER}\n63.0,1.0,1.0,145.0,233.0,1.0,2.0,150.0,0.0,2.3,3.0,0.0,6.0\n");
        let table = read(&input).expect("Should parse");
        assert_eq!(table.len(), 1);
        let r = table.records[0];
        assert_eq!(r.age, 63);
        assert_eq!(r.thal, 6);
        assert!((r.oldpeak - 2.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reports_all_missing_columns() {
        let input = "id,age,sex,cp,trestbps,fbs,restecg,thalach,exang,oldpeak,slope,thal\n";
        let err = read(input).expect_err("must fail");
        match err {
            CardioriskError::Validation(v) => {
                assert_eq!(v.fields(), vec![Field::Chol, Field::Ca]);
                assert!(v
                    .violations()
                    .iter()
                    .all(|x| x.constraint == Constraint::MissingColumn));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_collects_unparseable_cells_across_rows() {
        let input = format!(
            "{HEADER}\n52,1,3,130,180,0,0,170,0,0.0,1,?,3\n52,1,3,130,180,0,0,170,0,x,1,0,3\n"
        );
        let err = read(&input).expect_err("must fail");
        let CardioriskError::Validation(v) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            v.violations(),
            &[
                Violation::new(
                    Field::Ca,
                    Constraint::Unparseable {
                        row: 1,
                        raw: "?".into()
                    }
                ),
                Violation::new(
                    Field::Oldpeak,
                    Constraint::Unparseable {
                        row: 2,
                        raw: "x".into()
                    }
                ),
            ]
        );
    }

    #[test]
    fn test_short_row_is_reported_with_other_rows() {
        let input = format!(
            "{HEADER}\n52,1,3,130,180,0,0,170,0,0.0,1,0\n52,1,3,130,180,0,0,170,0,x,1,0,3\n"
        );
        let err = read(&input).expect_err("must fail");
        let CardioriskError::Validation(v) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            v.violations(),
            &[
                Violation::new(
                    Field::Thal,
                    Constraint::Unparseable {
                        row: 1,
                        raw: String::new()
                    }
                ),
                Violation::new(
                    Field::Oldpeak,
                    Constraint::Unparseable {
                        row: 2,
                        raw: "x".into()
                    }
                ),
            ]
        );
    }

    #[test]
    fn test_scores_and_appends_columns() {
        let input = format!(
            "patient,{HEADER}\n\
             a,52,1,3,130,180,0,0,170,0,0.0,1,0,3\n\
             b,52,1,3,130,180,0,0,170,0,0.0,1,0,5\n"
        );
        let service = RiskService::new(Arc::new(fixture_artifact()), Schema::standard());
        let mut source = CsvRecordSource::from_reader(input.as_bytes());
        let mut sink = CsvResultSink::from_writer(Vec::new());

        let report = service
            .score_table(&mut source, &mut sink)
            .expect("Should score");
        assert_eq!(report.scored_count(), 1);

        let out = String::from_utf8(sink.into_inner().expect("flush")).expect("utf8");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], format!("patient,{HEADER},prediction,risk_percent"));
        assert_eq!(lines[1], "a,52,1,3,130,180,0,0,170,0,0.0,1,0,3,0,5.9");
        assert_eq!(lines[2], "b,52,1,3,130,180,0,0,170,0,0.0,1,0,5,,");
    }

    #[test]
    fn test_rejected_batch_writes_nothing() {
        let input = format!(
            "{HEADER}\n52,1,3,130,180,0,0,170,0,0.0,1,0,3\n52,1,3,130,500,0,0,170,0,0.0,1,0,3\n"
        );
        let service = RiskService::new(Arc::new(fixture_artifact()), Schema::standard());
        let mut source = CsvRecordSource::from_reader(input.as_bytes());
        let mut sink = CsvResultSink::from_writer(Vec::new());

        let err = service
            .score_table(&mut source, &mut sink)
            .expect_err("must reject");
        let CardioriskError::Validation(v) = err else {
            panic!("expected validation error");
        };
        assert_eq!(v.fields(), vec![Field::Chol]);
        assert!(sink.into_inner().expect("flush").is_empty());
    }
}
