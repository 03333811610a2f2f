use super::{Record, RecordId};

/// Summary of the table's health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    pub record_count: usize,
    pub total_balance: i64,
    pub negative_balances: Vec<RecordId>,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn build_integrity_report(records: &[Record]) -> IntegrityReport {
    let mut issues = Vec::new();
    let mut total: i128 = 0;
    let mut negative_balances = Vec::new();

    for record in records {
        total += i128::from(record.balance);
        if record.balance < 0 {
            negative_balances.push(record.id);
            issues.push(format!(
                "Record {} has a negative balance ({})",
                record.id, record.balance
            ));
        }
    }

    let total_balance = i64::try_from(total).unwrap_or_else(|_| {
        issues.push(format!("Total balance {} does not fit in 64 bits", total));
        if total > 0 { i64::MAX } else { i64::MIN }
    });

    IntegrityReport {
        record_count: records.len(),
        total_balance,
        negative_balances,
        issues,
    }
}
