//! CSV ingestion of telephony exports with full replace per reference period.

use chrono::{NaiveDate, Utc};
use csv::StringRecord;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::audit::AuditLog;
use crate::database::models::PhoneLine;
use crate::database::{to_document, Collection, DatabaseError, Store};
use crate::filter::FilterData;
use crate::normalize::{digits_only, is_all_digits, normalize_amount, parse_amount};
use crate::types::{AuditAction, AuditTarget};

pub const TIM_CARRIER: &str = "Tim";
pub const UNDEFINED: &str = "Indefinido";
pub const UNKNOWN_CARRIER: &str = "Desconhecida";
pub const INVENTORY_DESCRIPTION: &str = "Importado via Inventário";

/// Minimum column count of an inventory row (the value sits in column 16).
const INVENTORY_COLUMNS: usize = 17;
const CARRIER_COLUMNS: usize = 3;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("reference period is required")]
    MissingPeriod,

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

/// The two export layouts the portal accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Comma-separated `number,description,value` export from the carrier.
    Carrier,
    /// Semicolon-separated inventory spreadsheet covering every carrier.
    Inventory,
}

impl Dialect {
    fn delimiter(self) -> u8 {
        match self {
            Dialect::Carrier => b',',
            Dialect::Inventory => b';',
        }
    }

    pub fn audit_target(self) -> AuditTarget {
        match self {
            Dialect::Carrier => AuditTarget::Tim,
            Dialect::Inventory => AuditTarget::Inventario,
        }
    }

    /// Records an upload of this dialect replaces.
    pub fn partition(self, period: &str) -> FilterData {
        match self {
            Dialect::Carrier => FilterData::matching(json!({ "carrier": TIM_CARRIER, "referencePeriod": period })),
            Dialect::Inventory => FilterData::matching(json!({ "referencePeriod": period })),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub status: &'static str,
    pub rows_imported: u64,
    pub rows_skipped: u64,
    pub unparsed_amounts: u64,
}

/// Outcome of parsing one upload, before anything is written.
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub lines: Vec<PhoneLine>,
    pub skipped: u64,
    pub unparsed_amounts: u64,
}

/// Why a row was left out of the batch.
#[derive(Debug, PartialEq, Eq)]
enum ParseSkip {
    TooFewColumns(usize),
    BadNumber,
}

struct Row {
    line: PhoneLine,
    amount_parsed: bool,
}

/// Parse `bytes` (lossy UTF-8, header row skipped) into phone lines.
pub fn parse(dialect: Dialect, bytes: &[u8], period: &str, today: NaiveDate) -> ParsedBatch {
    let text = String::from_utf8_lossy(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(dialect.delimiter())
        .from_reader(text.as_bytes());

    let mut batch = ParsedBatch::default();
    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(row = index + 2, "Skipping unreadable CSV row: {}", e);
                batch.skipped += 1;
                continue;
            }
        };

        let row = match dialect {
            Dialect::Carrier => parse_carrier_row(&record, period, today),
            Dialect::Inventory => parse_inventory_row(&record, period, today),
        };
        match row {
            Ok(row) => {
                if !row.amount_parsed {
                    batch.unparsed_amounts += 1;
                }
                batch.lines.push(row.line);
            }
            Err(reason) => {
                warn!(row = index + 2, ?reason, "Skipping CSV row");
                batch.skipped += 1;
            }
        }
    }
    batch
}

fn parse_carrier_row(record: &StringRecord, period: &str, today: NaiveDate) -> Result<Row, ParseSkip> {
    if record.len() < CARRIER_COLUMNS {
        return Err(ParseSkip::TooFewColumns(record.len()));
    }

    let number = field(record, 0);
    if !is_all_digits(number) {
        return Err(ParseSkip::BadNumber);
    }

    let raw_value = record.get(2);
    Ok(Row {
        amount_parsed: parse_amount(raw_value).is_some(),
        line: PhoneLine {
            id: 0,
            number: number.to_string(),
            carrier: TIM_CARRIER.to_string(),
            description: Some(field(record, 1).to_string()),
            monthly_value: normalize_amount(raw_value),
            reference_period: period.to_string(),
            department: Some(UNDEFINED.to_string()),
            branch: Some(UNDEFINED.to_string()),
            active: true,
            uploaded_on: today,
        },
    })
}

fn parse_inventory_row(record: &StringRecord, period: &str, today: NaiveDate) -> Result<Row, ParseSkip> {
    if record.len() < INVENTORY_COLUMNS {
        return Err(ParseSkip::TooFewColumns(record.len()));
    }

    let number = digits_only(record.get(0).unwrap_or_default());
    if number.is_empty() {
        return Err(ParseSkip::BadNumber);
    }

    let raw_value = record.get(16);
    Ok(Row {
        amount_parsed: parse_amount(raw_value).is_some(),
        line: PhoneLine {
            id: 0,
            number,
            carrier: or_default(field(record, 11), UNKNOWN_CARRIER),
            description: Some(INVENTORY_DESCRIPTION.to_string()),
            monthly_value: normalize_amount(raw_value),
            reference_period: period.to_string(),
            department: Some(or_default(field(record, 5), UNDEFINED)),
            branch: Some(or_default(field(record, 4), UNDEFINED)),
            active: true,
            uploaded_on: today,
        },
    })
}

fn field(record: &StringRecord, index: usize) -> &str {
    record.get(index).map(str::trim).unwrap_or_default()
}

fn or_default(value: &str, fallback: &str) -> String {
    if value.is_empty() { fallback.to_string() } else { value.to_string() }
}

/// Runs an upload end to end: parse, replace the partition, audit.
#[derive(Clone)]
pub struct Importer {
    store: Arc<dyn Store>,
    audit: AuditLog,
}

impl Importer {
    pub fn new(store: Arc<dyn Store>, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    pub async fn import(
        &self,
        actor: &str,
        dialect: Dialect,
        period: &str,
        bytes: &[u8],
    ) -> Result<ImportSummary, IngestError> {
        let period = period.trim();
        if period.is_empty() {
            return Err(IngestError::MissingPeriod);
        }

        let batch = parse(dialect, bytes, period, Utc::now().date_naive());
        if batch.unparsed_amounts > 0 {
            warn!(
                count = batch.unparsed_amounts,
                period, "Unparseable monetary values stored as 0"
            );
        }

        let docs = batch
            .lines
            .iter()
            .map(to_document)
            .collect::<Result<Vec<_>, _>>()?;

        // Both dialects lock on the period: an inventory upload also clears Tim rows.
        let outcome = self
            .store
            .replace_partition(Collection::PhoneLines, period, dialect.partition(period), docs)
            .await?;

        info!(
            ?dialect,
            period,
            deleted = outcome.deleted,
            inserted = outcome.inserted,
            skipped = batch.skipped,
            "Imported phone lines"
        );

        self.audit
            .record(
                actor,
                AuditAction::Upload,
                dialect.audit_target(),
                None,
                format!("Imported {} rows", outcome.inserted),
            )
            .await;

        Ok(ImportSummary {
            status: "success",
            rows_imported: outcome.inserted,
            rows_skipped: batch.skipped,
            unparsed_amounts: batch.unparsed_amounts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use rust_decimal::Decimal;
    use std::collections::BTreeSet;
    use std::str::FromStr;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn inventory_row(number: &str, branch: &str, dept: &str, carrier: &str, value: &str) -> String {
        let mut cols = vec![""; 17];
        cols[0] = number;
        cols[4] = branch;
        cols[5] = dept;
        cols[11] = carrier;
        cols[16] = value;
        cols.join(";")
    }

    #[test]
    fn carrier_rows_require_digit_numbers() {
        let csv = "numero,descricao,valor\n11999990000,Linha A,\"1.200,50\"\n(11) 9999,Linha B,10\nabc,x,1\n11888880000,Linha C,45.00\n";
        let batch = parse(Dialect::Carrier, csv.as_bytes(), "2024-01", today());

        let numbers: Vec<&str> = batch.lines.iter().map(|l| l.number.as_str()).collect();
        assert_eq!(numbers, vec!["11999990000", "11888880000"]);
        assert_eq!(batch.skipped, 2);
        assert_eq!(batch.lines[0].monthly_value, dec("1200.50"));
        assert_eq!(batch.lines[0].description.as_deref(), Some("Linha A"));
        assert_eq!(batch.lines[0].department.as_deref(), Some(UNDEFINED));
        assert_eq!(batch.lines[1].carrier, TIM_CARRIER);
    }

    #[test]
    fn carrier_short_rows_are_skipped() {
        let csv = "h1,h2,h3\n11999990000,only two\n11999990001,ok,5\n";
        let batch = parse(Dialect::Carrier, csv.as_bytes(), "2024-01", today());
        assert_eq!(batch.lines.len(), 1);
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn counts_unparsed_amounts_but_keeps_rows() {
        let csv = "h1,h2,h3\n11999990000,a,garbage\n11999990001,b,\n";
        let batch = parse(Dialect::Carrier, csv.as_bytes(), "2024-01", today());
        assert_eq!(batch.lines.len(), 2);
        assert_eq!(batch.unparsed_amounts, 1);
        assert!(batch.lines.iter().all(|l| l.monthly_value == Decimal::ZERO));
    }

    #[test]
    fn inventory_rows_map_columns_and_fallbacks() {
        let csv = [
            "header".to_string(),
            inventory_row("(11) 99999-0000", "Matriz", "TI", "Vivo", "R$ 89,90"),
            inventory_row("11 98888-0000", "", "", "", "10"),
            inventory_row("sem numero", "Matriz", "TI", "Claro", "1"),
            "11977770000;too;short".to_string(),
        ]
        .join("\n");
        let batch = parse(Dialect::Inventory, csv.as_bytes(), "2024-01", today());

        assert_eq!(batch.lines.len(), 2);
        assert_eq!(batch.skipped, 2);

        let first = &batch.lines[0];
        assert_eq!(first.number, "11999990000");
        assert_eq!(first.branch.as_deref(), Some("Matriz"));
        assert_eq!(first.department.as_deref(), Some("TI"));
        assert_eq!(first.carrier, "Vivo");
        assert_eq!(first.monthly_value, dec("89.90"));
        assert_eq!(first.description.as_deref(), Some(INVENTORY_DESCRIPTION));

        let second = &batch.lines[1];
        assert_eq!(second.carrier, UNKNOWN_CARRIER);
        assert_eq!(second.branch.as_deref(), Some(UNDEFINED));
        assert_eq!(second.department.as_deref(), Some(UNDEFINED));
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let mut bytes = b"h1,h2,h3\n11999990000,Descri".to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(b"o,5\n");
        let batch = parse(Dialect::Carrier, &bytes, "2024-01", today());
        assert_eq!(batch.lines.len(), 1);
        assert!(batch.lines[0].description.as_deref().unwrap().contains('\u{fffd}'));
    }

    async fn lines(store: &Arc<dyn Store>, filter: FilterData) -> Vec<PhoneLine> {
        crate::database::from_documents(store.list(Collection::PhoneLines, filter.order_by("id")).await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn second_carrier_upload_replaces_first() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let importer = Importer::new(store.clone(), AuditLog::new(store.clone()));

        importer
            .import("ana", Dialect::Carrier, "2024-02", b"h,h,h\n11000000000,feb,1\n")
            .await
            .unwrap();
        importer
            .import("ana", Dialect::Carrier, "2024-01", b"h,h,h\n11111111111,a,1\n11111111112,b,2\n")
            .await
            .unwrap();
        let summary = importer
            .import("ana", Dialect::Carrier, "2024-01", b"h,h,h\n12222222222,c,3\n")
            .await
            .unwrap();
        assert_eq!(summary, ImportSummary { status: "success", rows_imported: 1, rows_skipped: 0, unparsed_amounts: 0 });

        let jan = lines(&store, FilterData::matching(json!({ "referencePeriod": "2024-01" }))).await;
        assert_eq!(jan.iter().map(|l| l.number.as_str()).collect::<Vec<_>>(), vec!["12222222222"]);

        let feb = lines(&store, FilterData::matching(json!({ "referencePeriod": "2024-02" }))).await;
        assert_eq!(feb.len(), 1);
    }

    #[tokio::test]
    async fn inventory_upload_clears_every_carrier_for_period() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let audit = AuditLog::new(store.clone());
        let importer = Importer::new(store.clone(), audit.clone());

        importer
            .import("ana", Dialect::Carrier, "2024-01", b"h,h,h\n11111111111,a,1\n")
            .await
            .unwrap();
        let manual = PhoneLine {
            id: 0,
            number: "1133334444".to_string(),
            carrier: "Vivo".to_string(),
            description: None,
            monthly_value: dec("30"),
            reference_period: "2024-01".to_string(),
            department: None,
            branch: None,
            active: true,
            uploaded_on: today(),
        };
        store.insert(Collection::PhoneLines, to_document(&manual).unwrap()).await.unwrap();

        let csv = format!("header\n{}\n", inventory_row("11 95555-0000", "Filial", "RH", "Claro", "50"));
        importer.import("ana", Dialect::Inventory, "2024-01", csv.as_bytes()).await.unwrap();

        let jan = lines(&store, FilterData::matching(json!({ "referencePeriod": "2024-01" }))).await;
        assert_eq!(jan.len(), 1);
        assert_eq!(jan[0].carrier, "Claro");

        let entries = audit.recent(10).await.unwrap();
        assert_eq!(entries[0].target_type, "INVENTARIO");
        assert_eq!(entries[0].detail, "Imported 1 rows");
        assert_eq!(entries[1].target_type, "TIM");
    }

    fn numbers(base: u64, count: u64) -> BTreeSet<String> {
        (0..count).map(|i| (base + i).to_string()).collect()
    }

    fn carrier_csv(numbers: &BTreeSet<String>) -> String {
        let mut csv = String::from("numero,descricao,valor\n");
        for n in numbers {
            csv.push_str(&format!("{},linha,10\n", n));
        }
        csv
    }

    fn inventory_csv(numbers: &BTreeSet<String>) -> String {
        let mut csv = String::from("header\n");
        for n in numbers {
            // Tim rows, so a later carrier upload fully supersedes this batch
            csv.push_str(&inventory_row(n, "Matriz", "TI", TIM_CARRIER, "10"));
            csv.push('\n');
        }
        csv
    }

    /// Run two imports for the same period at once and return the numbers left behind.
    async fn race(first: (Dialect, String), second: (Dialect, String)) -> BTreeSet<String> {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let importer = Importer::new(store.clone(), AuditLog::new(store.clone()));

        let spawn = |(dialect, csv): (Dialect, String)| {
            let importer = importer.clone();
            tokio::spawn(async move { importer.import("ana", dialect, "2024-01", csv.as_bytes()).await })
        };
        let (a, b) = tokio::join!(spawn(first), spawn(second));
        a.unwrap().unwrap();
        b.unwrap().unwrap();

        lines(&store, FilterData::matching(json!({ "referencePeriod": "2024-01" })))
            .await
            .into_iter()
            .map(|l| l.number)
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_carrier_uploads_keep_one_batch() {
        let a = numbers(11_900_000_000, 50);
        let b = numbers(11_800_000_000, 30);
        for _ in 0..25 {
            let left = race((Dialect::Carrier, carrier_csv(&a)), (Dialect::Carrier, carrier_csv(&b))).await;
            assert!(left == a || left == b, "mixed batches: {} rows", left.len());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_carrier_and_inventory_uploads_keep_one_batch() {
        let a = numbers(11_900_000_000, 50);
        let b = numbers(11_700_000_000, 40);
        for _ in 0..25 {
            let left = race((Dialect::Carrier, carrier_csv(&a)), (Dialect::Inventory, inventory_csv(&b))).await;
            assert!(left == a || left == b, "mixed batches: {} rows", left.len());
        }
    }

    #[tokio::test]
    async fn blank_period_is_rejected() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let importer = Importer::new(store.clone(), AuditLog::new(store));
        let err = importer.import("ana", Dialect::Carrier, "  ", b"h,h,h\n1,a,1\n").await;
        assert!(matches!(err, Err(IngestError::MissingPeriod)));
    }
}
