use rdatacmp_common::{CanonicalRow, FieldDeclaration, FieldMapping, FieldValue, RawRow};

/// Project a raw row onto the declared field codes.
///
/// Unmapped fields are left out entirely. A mapped native name the row does
/// not carry becomes `Null`: the mapping says the column exists, the row just
/// has nothing in it.
pub fn resolve(raw: &RawRow, mapping: &FieldMapping, fields: &[FieldDeclaration]) -> CanonicalRow {
    fields
        .iter()
        .filter_map(|field| {
            let native = mapping.get(&field.code)?;
            let value = raw.get(native).cloned().unwrap_or(FieldValue::Null);
            Some((field.code.clone(), value))
        })
        .collect()
}

/// Resolve a whole row set, preserving order
pub fn resolve_all(
    rows: &[RawRow],
    mapping: &FieldMapping,
    fields: &[FieldDeclaration],
) -> Vec<CanonicalRow> {
    rows.iter().map(|raw| resolve(raw, mapping, fields)).collect()
}
