//! End-to-end checks of the pure ledger pipeline: resolve a worksheet,
//! flatten its headers, append readings, patch a row.

use indexmap::IndexMap;
use ledgerline_core::engine::position;
use ledgerline_core::{
    append_reading, compute_stats, plan_update, reconcile, resolve, CellValue, LedgerError, ProjectTable,
    Reading, Schema,
};

fn cells(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn sunrise_ledger() -> Vec<Vec<String>> {
    vec![
        cells(&[
            "", "", "EXPORT", "", "", "", "IMPORT", "", "", "", "SETTLEMENT", "", "", "DOCUMENTS", "", "", "", "",
            "",
        ]),
        cells(&[
            "MONTH",
            "MF",
            "Previous",
            "Current",
            "Difference",
            "Units",
            "Previous",
            "Current",
            "Difference",
            "Units",
            "Net Export",
            "Rate",
            "Bill",
            "PF",
            "Invoice No",
            "Invoice Date",
            "Submitted",
            "Verified",
            "Remarks",
        ]),
        cells(&[
            "Mar-25", "1,000", "10,000", "10,400", "400", "400,000", "2,000", "2,050", "50", "50,000", "350,000",
            "3.5", "1,225,000", "0.99", "INV-1", "05-04-2025", "06-04-2025", "08-04-2025", "",
        ]),
        cells(&[
            "Apr-25", "1,000", "10,400", "10,700", "300", "300,000", "2,050", "2,090", "40", "40,000", "260,000",
            "3.5", "910,000", "0.98", "INV-2", "05-05-2025", "06-05-2025", "08-05-2025", "",
        ]),
        cells(&["Total", "", "", "", "700", "700,000", "", "", "90", "90,000", "610,000", "", "2,135,000"]),
        cells(&["Notes:", "Meter replaced in Feb"]),
    ]
}

#[test]
fn test_resolve_then_append() {
    let titles = ["Project_Data", "Employees", "Sunrise Solar Park", "Sunrise"];
    let sheet = resolve("sunrise", &titles).unwrap();
    assert_eq!(sheet, "Sunrise");

    let rows = sunrise_ledger();
    let reading = Reading {
        date: "May-25".to_string(),
        current_export: 11_000.0,
        current_import: 2_100.0,
        power_factor: Some("0.97".to_string()),
        ..Reading::default()
    };
    let outcome = append_reading(&rows, &reading).unwrap();

    assert_eq!(outcome.baseline.row, 3);
    let c = outcome.computation;
    assert_eq!(c.prev_export, 10_700.0);
    assert_eq!(c.energy_export, 300_000.0);
    assert_eq!(c.prev_import, 2_090.0);
    assert_eq!(c.energy_import, 10_000.0);
    assert_eq!(c.net_export, 290_000.0);
    assert_eq!(c.bill_amount, 1_015_000);
    assert_eq!(outcome.row[position::POWER_FACTOR], CellValue::text("0.97"));
}

#[test]
fn test_ledger_headers_flatten_with_groups() {
    let rows = sunrise_ledger();
    let names = reconcile(&rows[0], &rows[1]);
    assert_eq!(names[position::PERIOD], "MONTH");
    assert_eq!(names[position::CURR_EXPORT], "EXPORT - Current");
    assert_eq!(names[position::IMPORT_ENERGY], "IMPORT - Units");
    assert_eq!(names[position::BILL], "SETTLEMENT - Bill");
    assert_eq!(names[position::REMARKS], "DOCUMENTS - Remarks");
    assert_eq!(Schema::from_rows(&rows).len(), position::ROW_WIDTH);
}

#[test]
fn test_patch_then_append_uses_patched_baseline() {
    let mut rows = sunrise_ledger();
    let mut updates = IndexMap::new();
    updates.insert("EXPORT - Current".to_string(), CellValue::Float(10_800.0));
    updates.insert("SETTLEMENT - Rate".to_string(), CellValue::Float(4.0));

    let patch = plan_update(&rows, "Apr-25", &updates).unwrap();
    assert_eq!(patch.updated(), 2);
    for write in &patch.writes {
        rows[write.row][write.col] = write.value.to_string();
    }

    let reading = Reading {
        date: "May-25".to_string(),
        current_export: 10_900.0,
        current_import: 2_090.0,
        ..Reading::default()
    };
    let c = append_reading(&rows, &reading).unwrap().computation;
    assert_eq!(c.prev_export, 10_800.0);
    assert_eq!(c.rate, 4.0);
    assert_eq!(c.bill_amount, 400_000);
}

#[test]
fn test_header_only_ledger_has_no_baseline() {
    let rows: Vec<Vec<String>> = sunrise_ledger().into_iter().take(2).collect();
    let err = append_reading(&rows, &Reading::default()).unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[test]
fn test_project_table_stats() {
    let rows: Vec<Vec<&str>> = vec![
        vec!["", "", "", "", ""],
        vec!["Name of Project", "Plant Type", "Capacity (MW)", "April-25 Payment", "May-25 Payment"],
        vec!["Sunrise", "Solar", "12", "600", "900"],
        vec!["Allianz", "Solar", "8", "400", "600"],
        vec!["", "", "", "", ""],
    ];
    let stats = compute_stats(&ProjectTable::from_rows(&rows));
    assert_eq!(stats.total_count, 2);
    assert_eq!(stats.total_capacity, 20.0);
    assert_eq!(stats.monthly_payments["April-25"], 1000.0);
    assert_eq!(stats.monthly_payments["May-25"], 1500.0);
    assert_eq!(stats.available_months, vec!["April-25", "May-25"]);
}
