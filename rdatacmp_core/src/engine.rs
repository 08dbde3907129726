use crate::comparator::Comparator;
use crate::key::{build_key, CompositeKey};
use crate::mapping;
use crate::registry::{ComparatorRegistry, PluginWarning, Registries};
use rdatacmp_common::{
    validate_fields, CanonicalRow, CellResult, CompareReport, CompareSummary, DataSource,
    FieldDeclaration, FieldValue, RDataCmpError, RowResult, RowStatus, RunId, Scheme,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Field declarations with their comparators resolved, ready to run
#[derive(Debug, Clone)]
pub struct ComparePlan {
    declarations: Vec<FieldDeclaration>,
    comparators: Vec<Comparator>,
    unique_codes: Vec<String>,
    warnings: Vec<PluginWarning>,
}

impl ComparePlan {
    /// Validate declarations and resolve every comparator reference.
    ///
    /// Fails before any I/O when the declarations are unusable. Comparator
    /// references that cannot be resolved only produce warnings; the field
    /// falls back to the default string comparator.
    pub fn build(
        fields: &[FieldDeclaration],
        registry: &ComparatorRegistry,
    ) -> Result<Self, RDataCmpError> {
        validate_fields(fields)?;

        let mut comparators = Vec::with_capacity(fields.len());
        let mut warnings = Vec::new();
        for field in fields {
            let comparator = match &field.comparator {
                None => Comparator::default(),
                Some(reference) => {
                    let (comparator, warning) = registry.resolve_ref(reference);
                    if let Some(warning) = warning {
                        warn!("Field {}: {}", field.code, warning);
                        warnings.push(warning);
                    }
                    comparator
                }
            };
            comparators.push(comparator);
        }

        Ok(Self {
            declarations: fields.to_vec(),
            comparators,
            unique_codes: fields
                .iter()
                .filter(|f| f.is_unique)
                .map(|f| f.code.clone())
                .collect(),
            warnings,
        })
    }

    pub fn declarations(&self) -> &[FieldDeclaration] {
        &self.declarations
    }

    pub fn fields(&self) -> impl Iterator<Item = (&FieldDeclaration, &Comparator)> {
        self.declarations.iter().zip(self.comparators.iter())
    }

    pub fn unique_codes(&self) -> &[String] {
        &self.unique_codes
    }

    pub fn warnings(&self) -> &[PluginWarning] {
        &self.warnings
    }

    fn key_of(&self, row: &CanonicalRow) -> CompositeKey {
        build_key(row, self.unique_codes.iter().map(String::as_str))
    }
}

/// Shadow rows by key. A repeated key replaces the earlier row, and the
/// replacement takes the later row's position in shadow order.
#[derive(Default)]
struct ShadowIndex {
    slots: Vec<Option<(CompositeKey, CanonicalRow)>>,
    positions: HashMap<CompositeKey, usize>,
    duplicates: usize,
}

impl ShadowIndex {
    fn insert(&mut self, key: CompositeKey, row: CanonicalRow) {
        if let Some(previous) = self.positions.insert(key.clone(), self.slots.len()) {
            warn!("Duplicate shadow key {}; keeping the later row", key);
            self.slots[previous] = None;
            self.duplicates += 1;
        }
        self.slots.push(Some((key, row)));
    }

    fn take(&mut self, key: &CompositeKey) -> Option<CanonicalRow> {
        let idx = self.positions.remove(key)?;
        self.slots[idx].take().map(|(_, row)| row)
    }

    fn into_remaining(self) -> impl Iterator<Item = (CompositeKey, CanonicalRow)> {
        self.slots.into_iter().flatten()
    }
}

/// Matches primary and shadow rows by composite key and compares each field
pub struct CompareEngine {
    plan: ComparePlan,
}

impl CompareEngine {
    pub fn new(plan: ComparePlan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &ComparePlan {
        &self.plan
    }

    /// Fetch both sides and compare them
    pub fn compare_sources(
        &self,
        primary: &dyn DataSource,
        shadow: &dyn DataSource,
    ) -> Result<CompareReport, RDataCmpError> {
        self.compare_sources_with_cancel(primary, shadow, None)
    }

    /// Either fetch failing aborts the whole compare; no partial report is
    /// produced.
    pub fn compare_sources_with_cancel(
        &self,
        primary: &dyn DataSource,
        shadow: &dyn DataSource,
        cancel: Option<&AtomicBool>,
    ) -> Result<CompareReport, RDataCmpError> {
        self.check_key_mapping(primary);
        self.check_key_mapping(shadow);

        info!("Fetching primary rows from {}", primary.instance_id());
        let primary_raw = primary.fetch_rows()?;
        info!("Fetching shadow rows from {}", shadow.instance_id());
        let shadow_raw = shadow.fetch_rows()?;

        let declarations = self.plan.declarations();
        let primary_rows = mapping::resolve_all(&primary_raw, primary.field_mapping(), declarations);
        let shadow_rows = mapping::resolve_all(&shadow_raw, shadow.field_mapping(), declarations);

        self.compare_rows_with_cancel(primary_rows, shadow_rows, cancel)
    }

    fn check_key_mapping(&self, source: &dyn DataSource) {
        let mapping = source.field_mapping();
        for code in self.plan.unique_codes() {
            if mapping.get(code).is_none() {
                warn!(
                    "Unique field {} has no mapping in {}; its key component is always empty",
                    code,
                    source.instance_id()
                );
            }
        }
    }

    pub fn compare_rows(
        &self,
        primary: Vec<CanonicalRow>,
        shadow: Vec<CanonicalRow>,
    ) -> Result<CompareReport, RDataCmpError> {
        self.compare_rows_with_cancel(primary, shadow, None)
    }

    /// Outer join over canonical rows.
    ///
    /// Output order: matched and primary-only rows in primary order, then
    /// shadow-only rows in shadow order.
    pub fn compare_rows_with_cancel(
        &self,
        primary: Vec<CanonicalRow>,
        shadow: Vec<CanonicalRow>,
        cancel: Option<&AtomicBool>,
    ) -> Result<CompareReport, RDataCmpError> {
        info!("Comparing {} primary rows with {} shadow rows", primary.len(), shadow.len());

        let mut summary = CompareSummary {
            primary_rows: primary.len(),
            shadow_rows: shadow.len(),
            ..CompareSummary::default()
        };

        let mut index = ShadowIndex::default();
        for row in shadow {
            let key = self.plan.key_of(&row);
            index.insert(key, row);
        }
        summary.duplicate_shadow_keys = index.duplicates;

        let mut rows = Vec::with_capacity(summary.primary_rows.max(index.positions.len()));

        for primary_row in primary {
            if cancel.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
                return Err(RDataCmpError::Cancelled);
            }

            let key = self.plan.key_of(&primary_row);
            let result = match index.take(&key) {
                Some(shadow_row) => {
                    let result = self.matched(&key, &primary_row, &shadow_row);
                    summary.matched += 1;
                    if result.has_differences {
                        summary.different += 1;
                    } else {
                        summary.identical += 1;
                    }
                    result
                }
                None => {
                    summary.primary_only += 1;
                    self.one_sided(&key, &primary_row, RowStatus::PrimaryOnly)
                }
            };
            rows.push(result);
        }

        for (key, shadow_row) in index.into_remaining() {
            summary.shadow_only += 1;
            rows.push(self.one_sided(&key, &shadow_row, RowStatus::ShadowOnly));
        }

        debug!(
            "Compare finished: {} matched ({} different), {} primary-only, {} shadow-only",
            summary.matched, summary.different, summary.primary_only, summary.shadow_only
        );

        Ok(CompareReport {
            run_id: RunId::new(),
            rows,
            summary,
        })
    }

    fn matched(
        &self,
        key: &CompositeKey,
        primary: &CanonicalRow,
        shadow: &CanonicalRow,
    ) -> RowResult {
        let cells = self
            .plan
            .fields()
            .map(|(field, comparator)| {
                let primary_value = primary.get(&field.code).cloned();
                let shadow_value = shadow.get(&field.code).cloned();
                let same = comparator.compare(
                    primary_value.as_ref().unwrap_or(&FieldValue::Null),
                    shadow_value.as_ref().unwrap_or(&FieldValue::Null),
                );
                CellResult {
                    code: field.code.clone(),
                    primary_value,
                    shadow_value,
                    is_different: !same,
                }
            })
            .collect();
        RowResult::new(key.to_string(), RowStatus::Matched, cells)
    }

    /// Every cell of an unmatched row is different; no comparator runs.
    fn one_sided(&self, key: &CompositeKey, row: &CanonicalRow, status: RowStatus) -> RowResult {
        let cells = self
            .plan
            .declarations()
            .iter()
            .map(|field| {
                let value = row.get(&field.code).cloned();
                let (primary_value, shadow_value) = match status {
                    RowStatus::ShadowOnly => (None, value),
                    _ => (value, None),
                };
                CellResult {
                    code: field.code.clone(),
                    primary_value,
                    shadow_value,
                    is_different: true,
                }
            })
            .collect();
        RowResult::new(key.to_string(), status, cells)
    }
}

/// Report of a scheme run plus the plugin warnings raised resolving it
#[derive(Debug, Clone)]
pub struct SchemeRun {
    pub report: CompareReport,
    pub warnings: Vec<PluginWarning>,
}

/// Resolve a scheme against `registries`, open both sources and compare them.
///
/// Field validation and source lookup happen before either source is read.
pub fn compare_scheme(
    scheme: &Scheme,
    registries: &Registries,
    cancel: Option<&AtomicBool>,
) -> Result<SchemeRun, RDataCmpError> {
    info!("Running scheme {}", scheme.name);
    let plan = ComparePlan::build(&scheme.fields, &registries.comparators)?;

    for code in scheme.undeclared_mappings() {
        warn!("Mapping for undeclared field {} is ignored", code);
    }

    let primary = registries.sources.open_for(&scheme.primary, &scheme.fields)?;
    let shadow = registries.sources.open_for(&scheme.shadow, &scheme.fields)?;

    let warnings = plan.warnings().to_vec();
    let engine = CompareEngine::new(plan);
    let report = engine.compare_sources_with_cancel(primary.as_ref(), shadow.as_ref(), cancel)?;
    Ok(SchemeRun { report, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::{FloatParams, StringParams};
    use crate::registry::{Registries, BUILTIN_GROUP};
    use crate::sources::MemorySource;
    use rdatacmp_common::{ComparatorRef, FieldMapping, RawRow, SourceConfig, SourceError};
    use std::collections::HashSet;

    fn row(pairs: &[(&str, FieldValue)]) -> CanonicalRow {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn engine(fields: &[FieldDeclaration]) -> CompareEngine {
        let registries = Registries::with_builtins();
        CompareEngine::new(ComparePlan::build(fields, &registries.comparators).unwrap())
    }

    fn id_name_fields() -> Vec<FieldDeclaration> {
        vec![FieldDeclaration::new("id").unique(), FieldDeclaration::new("name")]
    }

    struct FailingSource {
        mapping: FieldMapping,
    }

    impl DataSource for FailingSource {
        fn instance_id(&self) -> &str {
            "failing"
        }

        fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError> {
            Err(SourceError::NotFound("table orders".into()))
        }

        fn field_mapping(&self) -> &FieldMapping {
            &self.mapping
        }
    }

    #[test]
    fn test_scenario_a_matched_difference() {
        let engine = engine(&id_name_fields());
        let report = engine
            .compare_rows(
                vec![row(&[("id", 1.into()), ("name", "A".into())])],
                vec![row(&[("id", 1.into()), ("name", "B".into())])],
            )
            .unwrap();

        assert_eq!(report.rows.len(), 1);
        let result = &report.rows[0];
        assert_eq!(result.status, RowStatus::Matched);
        assert!(!result.cell("id").unwrap().is_different);
        let name = result.cell("name").unwrap();
        assert!(name.is_different);
        assert_eq!(name.primary_value, Some(FieldValue::from("A")));
        assert_eq!(name.shadow_value, Some(FieldValue::from("B")));
        assert_eq!(report.summary.different, 1);
    }

    #[test]
    fn test_scenario_b_primary_only() {
        let engine = engine(&[FieldDeclaration::new("id").unique()]);
        let report = engine.compare_rows(vec![row(&[("id", 1.into())])], vec![]).unwrap();

        assert_eq!(report.rows.len(), 1);
        let result = &report.rows[0];
        assert_eq!(result.status, RowStatus::PrimaryOnly);
        assert!(result.cells.iter().all(|c| c.is_different && c.shadow_value.is_none()));
        assert_eq!(report.summary.primary_only, 1);
    }

    #[test]
    fn test_scenario_c_shadow_only() {
        let engine = engine(&[FieldDeclaration::new("id").unique()]);
        let report = engine.compare_rows(vec![], vec![row(&[("id", 2.into())])]).unwrap();

        assert_eq!(report.rows.len(), 1);
        let result = &report.rows[0];
        assert_eq!(result.status, RowStatus::ShadowOnly);
        assert!(result.cells.iter().all(|c| c.is_different && c.primary_value.is_none()));
        assert_eq!(result.cell("id").unwrap().shadow_value, Some(FieldValue::Int(2)));
    }

    #[test]
    fn test_scenario_d_duplicate_shadow_key_last_wins() {
        let fields = vec![FieldDeclaration::new("id").unique(), FieldDeclaration::new("v")];
        let engine = engine(&fields);
        let report = engine
            .compare_rows(
                vec![row(&[("id", 1.into()), ("v", "y".into())])],
                vec![
                    row(&[("id", 1.into()), ("v", "x".into())]),
                    row(&[("id", 1.into()), ("v", "y".into())]),
                ],
            )
            .unwrap();

        assert_eq!(report.rows.len(), 1);
        assert!(!report.rows[0].has_differences);
        assert_eq!(report.summary.duplicate_shadow_keys, 1);
        assert_eq!(report.summary.identical, 1);
    }

    #[test]
    fn test_every_row_appears_exactly_once() {
        let engine = engine(&id_name_fields());
        let primary: Vec<_> = (0..6).map(|i| row(&[("id", i.into()), ("name", "p".into())])).collect();
        let shadow: Vec<_> = (3..10).map(|i| row(&[("id", i.into()), ("name", "p".into())])).collect();

        let report = engine.compare_rows(primary, shadow).unwrap();
        let keys: Vec<&str> = report.rows.iter().map(|r| r.key.as_str()).collect();
        let unique: HashSet<&str> = keys.iter().copied().collect();

        assert_eq!(keys.len(), 10);
        assert_eq!(unique.len(), 10);
        assert_eq!(report.summary.matched, 3);
        assert_eq!(report.summary.primary_only, 3);
        assert_eq!(report.summary.shadow_only, 4);
    }

    #[test]
    fn test_output_order() {
        let engine = engine(&[FieldDeclaration::new("id").unique()]);
        let primary = vec![row(&[("id", 3.into())]), row(&[("id", 1.into())]), row(&[("id", 2.into())])];
        let shadow = vec![
            row(&[("id", 9.into())]),
            row(&[("id", 1.into())]),
            row(&[("id", 8.into())]),
            row(&[("id", 9.into())]),
        ];

        let report = engine.compare_rows(primary, shadow).unwrap();
        let keys: Vec<&str> = report.rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["3", "1", "2", "8", "9"]);
    }

    #[test]
    fn test_configured_comparators_are_used() {
        let fields = vec![
            FieldDeclaration::new("id").unique(),
            FieldDeclaration::new("name")
                .with_comparator(ComparatorRef::new(BUILTIN_GROUP, "String (ignore case)")),
            FieldDeclaration::new("amount").with_comparator(
                ComparatorRef::new(BUILTIN_GROUP, "Float").with_config(r#"{"precision":2}"#),
            ),
        ];
        let engine = engine(&fields);
        assert_eq!(
            engine.plan().fields().nth(2).map(|(_, c)| c.clone()),
            Some(Comparator::Float(FloatParams { precision: 2 }))
        );

        let report = engine
            .compare_rows(
                vec![row(&[("id", 1.into()), ("name", "ann".into()), ("amount", 1.234.into())])],
                vec![row(&[("id", "1".into()), ("name", "ANN".into()), ("amount", "1.235".into())])],
            )
            .unwrap();
        assert!(!report.rows[0].has_differences);
    }

    #[test]
    fn test_unknown_comparator_warns_and_defaults() {
        let fields = vec![
            FieldDeclaration::new("id").unique(),
            FieldDeclaration::new("name").with_comparator(ComparatorRef::new("gone", "Fuzzy")),
        ];
        let registries = Registries::with_builtins();
        let plan = ComparePlan::build(&fields, &registries.comparators).unwrap();

        assert_eq!(plan.warnings().len(), 1);
        assert_eq!(
            plan.fields().nth(1).map(|(_, c)| c.clone()),
            Some(Comparator::String(StringParams::default()))
        );
    }

    #[test]
    fn test_absent_fields_compare_as_null() {
        let engine = engine(&id_name_fields());
        let report = engine
            .compare_rows(
                vec![row(&[("id", 1.into())])],
                vec![row(&[("id", 1.into()), ("name", "".into())])],
            )
            .unwrap();

        let name = report.rows[0].cell("name").unwrap();
        assert_eq!(name.primary_value, None);
        assert!(!name.is_different);
    }

    #[test]
    fn test_no_unique_field_is_rejected() {
        let registries = Registries::with_builtins();
        let result = ComparePlan::build(&[FieldDeclaration::new("id")], &registries.comparators);
        assert!(matches!(result, Err(RDataCmpError::Config(_))));
    }

    #[test]
    fn test_fetch_failure_aborts() {
        let engine = engine(&id_name_fields());
        let mapping = FieldMapping::identity(&id_name_fields());
        let good = MemorySource::new("good", vec![], mapping.clone());
        let bad = FailingSource { mapping };

        let result = engine.compare_sources(&good, &bad);
        assert!(matches!(result, Err(RDataCmpError::Source(SourceError::NotFound(_)))));
        let result = engine.compare_sources(&bad, &good);
        assert!(matches!(result, Err(RDataCmpError::Source(_))));
    }

    #[test]
    fn test_compare_sources_applies_mappings() {
        let fields = id_name_fields();
        let engine = engine(&fields);
        let primary_rows: Vec<RawRow> = vec![[
            ("ID".to_string(), FieldValue::Int(1)),
            ("Name".to_string(), FieldValue::from("Ann")),
        ]
        .into_iter()
        .collect()];
        let shadow_rows: Vec<RawRow> = vec![[
            ("order_id".to_string(), FieldValue::from("1")),
            ("customer".to_string(), FieldValue::from("Ann")),
        ]
        .into_iter()
        .collect()];

        let primary = MemorySource::new(
            "primary",
            primary_rows,
            FieldMapping::new().with("id", "ID").with("name", "Name"),
        );
        let shadow = MemorySource::new(
            "shadow",
            shadow_rows,
            FieldMapping::new().with("id", "order_id").with("name", "customer"),
        );

        let report = engine.compare_sources(&primary, &shadow).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].status, RowStatus::Matched);
        assert!(!report.rows[0].has_differences);
    }

    #[test]
    fn test_cancellation_between_rows() {
        let engine = engine(&[FieldDeclaration::new("id").unique()]);
        let cancel = AtomicBool::new(true);
        let result = engine.compare_rows_with_cancel(
            vec![row(&[("id", 1.into())])],
            vec![],
            Some(&cancel),
        );
        assert!(matches!(result, Err(RDataCmpError::Cancelled)));
    }

    fn memory_registries() -> Registries {
        let mut registries = Registries::with_builtins();
        registries.sources.register("test", "Memory", |config: &SourceConfig| {
            let name = config.option("name").unwrap_or("rows").to_string();
            let rows: Vec<RawRow> = (1..=3)
                .map(|i| {
                    let label = if name == "shadow" && i == 2 { "changed" } else { "same" };
                    [
                        ("id".to_string(), FieldValue::Int(i)),
                        ("label".to_string(), FieldValue::from(label)),
                    ]
                    .into_iter()
                    .collect()
                })
                .collect();
            Ok(Box::new(MemorySource::new(name, rows, config.mapping.clone())) as Box<dyn DataSource>)
        });
        registries
    }

    fn memory_scheme() -> Scheme {
        Scheme {
            name: "memory".into(),
            description: None,
            primary: SourceConfig::new("test", "Memory").with_option("name", "primary"),
            shadow: SourceConfig::new("test", "Memory").with_option("name", "shadow"),
            fields: vec![
                FieldDeclaration::new("id").unique(),
                FieldDeclaration::new("label")
                    .with_comparator(ComparatorRef::new("elsewhere", "Fuzzy")),
            ],
        }
    }

    #[test]
    fn test_compare_scheme_end_to_end() {
        let mut scheme = memory_scheme();
        scheme.primary.identity_mapping = true;
        scheme.shadow.identity_mapping = true;

        let run = compare_scheme(&scheme, &memory_registries(), None).unwrap();
        assert_eq!(run.warnings.len(), 1);
        assert_eq!(run.report.summary.matched, 3);
        assert_eq!(run.report.summary.different, 1);
        let changed: Vec<&str> = run.report.only_differences().map(|r| r.key.as_str()).collect();
        assert_eq!(changed, vec!["2"]);
    }

    #[test]
    fn test_compare_scheme_unknown_source() {
        let mut scheme = memory_scheme();
        scheme.shadow = SourceConfig::new("db", "Oracle");
        let result = compare_scheme(&scheme, &memory_registries(), None);
        assert!(matches!(result, Err(RDataCmpError::PluginNotFound { .. })));
    }
}
