use crate::domain::{InputError, RecordChanges, TableSchema, Value};

/// SQL text derived once from a validated schema.
#[derive(Debug, Clone)]
pub struct Statements {
    pub create_table: String,
    pub select_all: String,
    pub select_one: String,
    pub insert: String,
    pub delete: String,
    pub select_balance: String,
    pub debit: String,
    pub credit: String,
    pub sum_balances: String,
    table: String,
    balance: String,
}

impl Statements {
    pub fn new(schema: &TableSchema) -> Self {
        let table = schema.table().quoted();
        let balance = schema.balance_column().name.quoted();
        let attributes: Vec<String> = schema.attributes().map(|c| c.name.quoted()).collect();

        // Balance first, then attributes in schema order
        let mut insert_columns = vec![balance.clone()];
        insert_columns.extend(attributes.iter().cloned());
        let placeholders = vec!["?"; insert_columns.len()].join(", ");
        let select_list = insert_columns.join(", ");

        Self {
            create_table: schema.create_table_sql(),
            select_all: format!("SELECT id, {} FROM {} ORDER BY id", select_list, table),
            select_one: format!("SELECT id, {} FROM {} WHERE id = ?", select_list, table),
            insert: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table, select_list, placeholders
            ),
            delete: format!("DELETE FROM {} WHERE id = ?", table),
            select_balance: format!("SELECT {} AS balance FROM {} WHERE id = ?", balance, table),
            debit: format!(
                "UPDATE {table} SET {balance} = {balance} - ? WHERE id = ? AND {balance} >= ?"
            ),
            credit: format!("UPDATE {table} SET {balance} = {balance} + ? WHERE id = ?"),
            sum_balances: format!("SELECT COALESCE(SUM({}), 0) AS total FROM {}", balance, table),
            table,
            balance,
        }
    }

    /// UPDATE touching only the changed columns, plus the attribute values to
    /// bind after the balance (if any) and before the id.
    ///
    /// Every field must name a managed attribute.
    pub fn update<'c>(
        &self,
        schema: &TableSchema,
        changes: &'c RecordChanges,
    ) -> Result<(String, Vec<&'c Value>), InputError> {
        if changes.is_empty() {
            return Err(InputError::NoChanges);
        }

        let mut sets = Vec::new();
        let mut values = Vec::new();
        if changes.balance.is_some() {
            sets.push(format!("{} = ?", self.balance));
        }
        for field in &changes.attributes {
            let column = schema
                .column(&field.name)
                .filter(|column| !schema.is_balance(column))
                .ok_or_else(|| InputError::UnknownColumn(field.name.clone()))?;
            sets.push(format!("{} = ?", column.name.quoted()));
            values.push(&field.value);
        }
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        Ok((sql, values))
    }
}
