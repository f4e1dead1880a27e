//! Plans for the legacy clinic database
//!
//! Source positions refer to the column order of the legacy tables, which is
//! both the tuple order of their dump and the order of `select_columns`.

use super::{ColumnMap, TablePlan};
use crate::convert::Converter::{Integer, Real, Text};

pub(super) fn plans() -> Vec<TablePlan> {
    vec![
        patients(),
        payment_method(),
        stock_items(),
        receipts(),
        receipt_items(),
    ]
}

fn patients() -> TablePlan {
    TablePlan::new(
        "patients",
        "CREATE TABLE patients (\
         icpassport TEXT PRIMARY KEY,\
         name TEXT NOT NULL,\
         receipt_name TEXT,\
         preferred_name TEXT,\
         company TEXT,\
         phone_fixed TEXT,\
         phone_mobile TEXT,\
         email TEXT)",
        "INSERT OR REPLACE INTO patients VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .with_index("CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name)")
    .with_columns(vec![
        ColumnMap::new(1, Text),
        ColumnMap::new(2, Text),
        ColumnMap::new(21, Text),
        ColumnMap::new(29, Text),
        ColumnMap::new(16, Text),
        ColumnMap::new(10, Text),
        ColumnMap::new(11, Text),
        ColumnMap::new(30, Text),
    ])
    .with_select_columns([
        "register_date",
        "icpassport",
        "name",
        "sex",
        "DOB",
        "address",
        "city",
        "state",
        "country",
        "postcode",
        "phone_fixed",
        "phone_mobile",
        "remark",
        "medical_illness",
        "occupation",
        "removed",
        "company",
        "photo",
        "race",
        "marketing",
        "source",
        "receipt_name",
        "Title",
        "PatientStatus",
        "EmergencyContact",
        "EmergencyPhoneNo",
        "BillingType",
        "companyaddress",
        "companycontact",
        "preferredname",
        "Emailaddress",
        "Memberid",
        "app_doublevalue",
        "username",
        "modified_date",
        "language",
        "contact_relation",
        "religion",
        "pat_id",
        "national",
        "lastName",
        "ref_id",
        "priority_id",
        "fingerprint",
    ])
}

fn payment_method() -> TablePlan {
    TablePlan::new(
        "payment_method",
        "CREATE TABLE payment_method (paycode TEXT PRIMARY KEY, description TEXT NOT NULL)",
        "INSERT OR REPLACE INTO payment_method VALUES (?, ?)",
    )
    .with_columns(vec![ColumnMap::new(0, Text), ColumnMap::new(1, Text)])
    .with_select_columns(["paycode", "description"])
}

fn stock_items() -> TablePlan {
    TablePlan::new(
        "stock_items",
        "CREATE TABLE stock_items (\
         id TEXT PRIMARY KEY,\
         name TEXT NOT NULL,\
         category TEXT,\
         selling_price REAL,\
         removed INTEGER,\
         is_service INTEGER,\
         unit_cost REAL)",
        "INSERT OR REPLACE INTO stock_items VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .with_index("CREATE INDEX IF NOT EXISTS idx_stock_items_name ON stock_items(name)")
    .with_columns(vec![
        ColumnMap::new(0, Text),
        ColumnMap::new(1, Text),
        ColumnMap::new(3, Text),
        ColumnMap::new(4, Real),
        ColumnMap::new(5, Integer),
        ColumnMap::new(6, Integer),
        ColumnMap::new(23, Real),
    ])
    .with_select_columns([
        "id",
        "name",
        "company",
        "category",
        "selling_price",
        "removed",
        "is_service",
        "dose",
        "times",
        "day",
        "procedure",
        "is_print",
        "proposed_qty",
        "proposed_remark",
        "doseqty",
        "timesqty",
        "stockcode",
        "alternatecode",
        "username",
        "modified_date",
        "restock_level",
        "ratio",
        "tax_code",
        "unit_cost",
        "commission",
        "is_restrict",
    ])
}

fn receipts() -> TablePlan {
    TablePlan::new(
        "receipts",
        "CREATE TABLE receipts (\
         rcpt_id TEXT PRIMARY KEY,\
         issued TEXT NOT NULL,\
         patient_id TEXT NOT NULL,\
         total REAL,\
         subtotal REAL,\
         gst REAL,\
         payment_code TEXT,\
         remark TEXT,\
         removed INTEGER,\
         discount REAL,\
         rounding REAL,\
         consult_fees REAL,\
         done_by TEXT,\
         department_type TEXT,\
         settled_by TEXT,\
         tax_total REAL)",
        "INSERT OR REPLACE INTO receipts VALUES \
         (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .with_index(
        "CREATE INDEX IF NOT EXISTS idx_receipts_patient_date ON receipts(patient_id, issued)",
    )
    .with_columns(vec![
        ColumnMap::new(0, Text),
        ColumnMap::new(1, Text),
        ColumnMap::new(2, Text),
        ColumnMap::new(4, Real),
        ColumnMap::new(9, Real),
        ColumnMap::new(10, Real),
        ColumnMap::new(5, Text),
        ColumnMap::new(7, Text),
        ColumnMap::new(8, Integer),
        ColumnMap::new(16, Real),
        ColumnMap::new(18, Real),
        ColumnMap::new(3, Real),
        ColumnMap::new(17, Text),
        ColumnMap::new(20, Text),
        ColumnMap::new(14, Text),
        ColumnMap::new(15, Real),
    ])
    .with_select_columns([
        "rcpt_id",
        "issued",
        "patient_id",
        "consult_fees",
        "total",
        "payment",
        "Billed",
        "Remark",
        "removed",
        "subtotal",
        "gst",
        "itemize",
        "username",
        "modified_date",
        "settledby",
        "tax_total",
        "disc_total",
        "done_by",
        "rounding",
        "mr_id",
        "department_type",
        "printed_name",
    ])
}

fn receipt_items() -> TablePlan {
    TablePlan::new(
        "receipt_items",
        "CREATE TABLE receipt_items (\
         id INTEGER PRIMARY KEY,\
         rcpt_id TEXT NOT NULL,\
         item_id TEXT,\
         qty INTEGER,\
         unit_price REAL,\
         subtotal REAL,\
         discount REAL,\
         username TEXT,\
         remark TEXT)",
        "INSERT OR REPLACE INTO receipt_items VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .with_index("CREATE INDEX IF NOT EXISTS idx_receipt_items_rcpt ON receipt_items(rcpt_id)")
    .with_index("CREATE INDEX IF NOT EXISTS idx_receipt_items_item ON receipt_items(item_id)")
    .with_columns(vec![
        ColumnMap::new(0, Integer),
        ColumnMap::new(1, Text),
        ColumnMap::new(2, Text),
        ColumnMap::new(3, Integer),
        ColumnMap::new(4, Real),
        ColumnMap::new(5, Real),
        ColumnMap::new(18, Real),
        ColumnMap::new(10, Text),
        ColumnMap::new(8, Text),
    ])
    .with_select_columns([
        "ID",
        "rcpt_id",
        "item",
        "qty",
        "unitprice",
        "subtotal",
        "DoseID",
        "TimesID",
        "rcpt_remark",
        "day",
        "username",
        "doseqty",
        "timesqty",
        "bodypart",
        "pres_check",
        "modified_date",
        "tax_subtotal",
        "disc_amount",
        "unit_fixed_cost",
        "commission",
    ])
}
