// ============================================================
// Layer 4 — Typed Datasets
// ============================================================
// Turns a validated CsvTable into numeric matrices.
//
//   LabeledDataset   → training input: features, isPlanet,
//                      star group keys, transit ids
//   UnlabeledDataset → inference input: features, transit ids
//
// Group keys live beside the feature matrix, never inside it.

use crate::data::contract::{
    FeatureContract, DEC_COLUMN, LABEL_COLUMN, RA_COLUMN, TRANSIT_ID_COLUMN,
};
use crate::data::loader::CsvTable;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::transit::StarGroupKey;

/// Row-major feature matrix: `features[row][column]`.
pub type FeatureMatrix = Vec<Vec<f64>>;

#[derive(Debug, Clone)]
pub struct LabeledDataset {
    pub transit_ids: Vec<String>,
    pub groups:      Vec<StarGroupKey>,
    pub features:    FeatureMatrix,
    pub labels:      Vec<bool>,
}

impl LabeledDataset {
    /// Validate `table` against `contract` and the label column,
    /// then parse every feature and label cell.
    pub fn from_table(table: &CsvTable, contract: &FeatureContract) -> PipelineResult<Self> {
        let mut required = contract.columns().to_vec();
        required.push(LABEL_COLUMN.to_string());
        FeatureContract::new(required).validate(table.headers())?;
        let feature_idx = contract.column_indices(table.headers())?;

        let label_idx = table.column_index(LABEL_COLUMN).unwrap_or_default();
        let ra_idx    = table.column_index(RA_COLUMN);
        let dec_idx   = table.column_index(DEC_COLUMN);

        let transit_ids = transit_ids(table);
        let mut groups   = Vec::with_capacity(table.len());
        let mut features = Vec::with_capacity(table.len());
        let mut labels   = Vec::with_capacity(table.len());

        for (row_no, row) in table.rows().iter().enumerate() {
            let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(String::as_str);
            groups.push(StarGroupKey::from_coordinates(
                cell(ra_idx),
                cell(dec_idx),
                &transit_ids[row_no],
            ));
            features.push(parse_row(row, &feature_idx, contract, row_no + 1)?);
            labels.push(parse_label(&row[label_idx], row_no + 1)?);
        }

        Ok(Self { transit_ids, groups, features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rows at `indices`, in the given order.
    pub fn select(&self, indices: &[usize]) -> LabeledDataset {
        LabeledDataset {
            transit_ids: indices.iter().map(|&i| self.transit_ids[i].clone()).collect(),
            groups:      indices.iter().map(|&i| self.groups[i].clone()).collect(),
            features:    indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels:      indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    pub fn positive_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }
}

#[derive(Debug, Clone)]
pub struct UnlabeledDataset {
    pub transit_ids: Vec<String>,
    pub features:    FeatureMatrix,
}

impl UnlabeledDataset {
    pub fn from_table(table: &CsvTable, contract: &FeatureContract) -> PipelineResult<Self> {
        let feature_idx = contract.column_indices(table.headers())?;
        let features = table
            .rows()
            .iter()
            .enumerate()
            .map(|(row_no, row)| parse_row(row, &feature_idx, contract, row_no + 1))
            .collect::<PipelineResult<FeatureMatrix>>()?;
        Ok(Self { transit_ids: transit_ids(table), features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// `transit_id` cells, or 1-based row numbers when the column is absent.
fn transit_ids(table: &CsvTable) -> Vec<String> {
    match table.column_index(TRANSIT_ID_COLUMN) {
        Some(idx) => table.rows().iter().map(|r| r[idx].trim().to_string()).collect(),
        None => (1..=table.len()).map(|n| n.to_string()).collect(),
    }
}

fn parse_row(
    row:         &[String],
    feature_idx: &[usize],
    contract:    &FeatureContract,
    row_no:      usize,
) -> PipelineResult<Vec<f64>> {
    feature_idx
        .iter()
        .zip(contract.columns())
        .map(|(&i, column)| parse_feature(&row[i], column, row_no))
        .collect()
}

/// Features must be finite numbers. Blank cells are rejected.
pub fn parse_feature(cell: &str, column: &str, row_no: usize) -> PipelineResult<f64> {
    match cell.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(PipelineError::InvalidFeatureValue {
            column: column.to_string(),
            row:    row_no,
            value:  cell.to_string(),
        }),
    }
}

/// Accepts 1/0, 1.0/0.0 and true/false.
pub fn parse_label(cell: &str, row_no: usize) -> PipelineResult<bool> {
    let v = cell.trim().to_ascii_lowercase();
    match v.as_str() {
        "1" | "1.0" | "true"  => Ok(true),
        "0" | "0.0" | "false" => Ok(false),
        _ => Err(PipelineError::InvalidFeatureValue {
            column: LABEL_COLUMN.to_string(),
            row:    row_no,
            value:  cell.to_string(),
        }),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn contract() -> FeatureContract {
        FeatureContract::new(vec!["f1".into(), "f2".into()])
    }

    #[test]
    fn test_labeled_dataset_parses_rows() {
        let csv = "transit_id,ra,dec,f2,f1,isPlanet\n\
                   A,1.0,2.0,20,10,1\n\
                   B,1.0,2.0,21,11,0\n\
                   C,5.0,6.0,22,12,true\n";
        let table = CsvTable::from_reader(csv.as_bytes()).unwrap();
        let ds = LabeledDataset::from_table(&table, &contract()).unwrap();

        assert_eq!(ds.len(), 3);
        assert_eq!(ds.features[0], vec![10.0, 20.0]);
        assert_eq!(ds.labels, vec![true, false, true]);
        assert_eq!(ds.groups[0], ds.groups[1]);
        assert_ne!(ds.groups[0], ds.groups[2]);
        assert_eq!(ds.positive_count(), 2);
    }

    #[test]
    fn test_missing_label_column_is_schema_error() {
        let table = CsvTable::from_reader("f1,f2\n1,2\n".as_bytes()).unwrap();
        match LabeledDataset::from_table(&table, &contract()) {
            Err(PipelineError::SchemaValidation { missing, .. }) => {
                assert_eq!(missing, vec![LABEL_COLUMN.to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_feature_is_rejected() {
        let table = CsvTable::from_reader("f1,f2\n1,abc\n".as_bytes()).unwrap();
        match UnlabeledDataset::from_table(&table, &contract()) {
            Err(PipelineError::InvalidFeatureValue { column, row, .. }) => {
                assert_eq!(column, "f2");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_row_numbers_stand_in_for_missing_transit_ids() {
        let table = CsvTable::from_reader("f1,f2\n1,2\n3,4\n".as_bytes()).unwrap();
        let ds = UnlabeledDataset::from_table(&table, &contract()).unwrap();
        assert_eq!(ds.transit_ids, vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_bad_label_is_rejected() {
        assert!(parse_label("yes", 4).is_err());
        assert!(parse_label(" 1.0 ", 4).unwrap());
    }
}
