use crate::registry::{ColumnSpec, SchemaRegistry, SqlType, TableSpec};

/// The production destination catalog: one `TableSpec` per watched sheet,
/// registered once at start-up (spec §9 "runtime-reflected entity metadata"
/// REDESIGN FLAG — a plain static list, no scanning).
///
/// Extending the warehouse with a new sheet means adding a `TableSpec` here
/// and applying the matching migration out of band (spec §6 "Migration is
/// expected to be applied out of band"); this crate never infers schema.
pub fn production_catalog() -> SchemaRegistry {
    SchemaRegistry::new(vec![contract_creation_table()])
}

/// `新規to業務管理` — new-contract intake sheet, per spec §8 scenario S2.
fn contract_creation_table() -> TableSpec {
    TableSpec::new(
        "新規to業務管理",
        "contract_creation",
        vec![
            ColumnSpec::new("契約ID", "contract_id", SqlType::Text)
                .key()
                .max_length(32),
            ColumnSpec::new("物件No", "property_no", SqlType::Integer),
            ColumnSpec::new("出力日時", "output_at", SqlType::Timestamp),
        ],
    )
    .with_schema("edges_raw")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_catalog_registers_the_contract_creation_sheet() {
        let registry = production_catalog();
        let spec = registry
            .spec_by_sheet("新規to業務管理")
            .expect("contract_creation sheet must be registered");
        assert_eq!(spec.table_name, "contract_creation");
        assert_eq!(spec.qualified_name(), "edges_raw.contract_creation");
        assert_eq!(spec.columns.len(), 3);
    }
}
