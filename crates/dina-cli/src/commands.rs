//! Subcommand implementations.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use dina_client::{ApiClient, ClientConfig, FilterParam};
use dina_filter::{
    compile_model, AttributeKind, FilterAttribute, FilterModel, GroupOperator, Predicate,
    SearchType,
};
use dina_table::{
    load_list_state, save_list_state, FileStateStore, ListPageState, RemoteTable, SortRules,
    TableConfig, TableController,
};
use serde::Deserialize;
use tracing::info;

use crate::formatter::Formatter;
use crate::{FilterArgs, ListArgs};

/// Contents of a `--filter-file`: a bare model, or a model with the
/// attribute definitions it should be compiled against.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FilterFile {
    WithAttributes {
        filter: FilterModel,
        #[serde(default)]
        attributes: Vec<FilterAttribute>,
    },
    Model(FilterModel),
}

/// A filter assembled from the command line.
#[derive(Debug, Default)]
struct FilterInput {
    model: Option<FilterModel>,
    attributes: Vec<FilterAttribute>,
}

impl FilterInput {
    fn compile(&self, model: Option<&FilterModel>) -> String {
        model
            .map(|m| compile_model(m, &self.attributes))
            .unwrap_or_default()
    }

    fn attribute_mut(&mut self, name: &str) -> &mut FilterAttribute {
        let index = match self.attributes.iter().position(|a| a.name == name) {
            Some(i) => i,
            None => {
                self.attributes.push(FilterAttribute::text(name));
                self.attributes.len() - 1
            }
        };
        &mut self.attributes[index]
    }
}

/// Compile the filter options and print the result.
pub fn rsql(args: &FilterArgs, formatter: &dyn Formatter) -> anyhow::Result<String> {
    let input = build_filter(args)?;
    Ok(formatter.format_rsql(&input.compile(input.model.as_ref())))
}

/// Fetch one page of a list.
pub async fn list(
    config: &ClientConfig,
    args: &ListArgs,
    state_file: Option<&Path>,
    formatter: &dyn Formatter,
) -> anyhow::Result<String> {
    let store = state_file.map(FileStateStore::new);
    let saved = match (&store, &args.list_id) {
        (Some(store), Some(id)) => load_list_state(store, id)?,
        _ => None,
    };

    let input = build_filter(&args.filter)?;
    let filter = input
        .model
        .clone()
        .or_else(|| saved.as_ref().and_then(|s| s.filter.clone()));
    let rsql = input.compile(filter.as_ref());

    let table_config = table_config(args, saved.as_ref());
    info!(path = %args.path, rsql = %rsql, page = args.page, "fetching list");

    let client = Arc::new(ApiClient::new(config.clone())?);
    let start = RemoteTable::new(table_config)
        .with_filter(Some(FilterParam::Rsql(rsql)))
        .starting_at_page(args.page.saturating_sub(1));
    let mut table = TableController::with_table(client, start);
    table.load();
    let view = table.settle().await;

    if let Some(err) = &view.error {
        bail!("{}", err);
    }

    if let (Some(store), Some(id)) = (&store, &args.list_id) {
        let state = ListPageState {
            filter,
            page_size: Some(view.page_size),
            sort: table.table().query().sort.columns().to_vec(),
        };
        save_list_state(store, id, &state)?;
    }

    Ok(formatter.format_page(&view))
}

/// Table configuration from saved state overridden by explicit options.
fn table_config(args: &ListArgs, saved: Option<&ListPageState>) -> TableConfig {
    let mut config = TableConfig::new(&args.path);
    if let Some(saved) = saved {
        config = saved.apply_to(config);
    }
    if let Some(size) = args.page_size {
        config.default_page_size = size;
    }
    if !config.page_size_options.contains(&config.default_page_size) {
        config.page_size_options.push(config.default_page_size);
    }
    if let Some(sort) = &args.sort {
        config.default_sort = SortRules::parse(sort).columns().to_vec();
    }
    if let Some(include) = &args.include {
        config = config.with_include(include);
    }
    config
}

fn build_filter(args: &FilterArgs) -> anyhow::Result<FilterInput> {
    let mut input = FilterInput::default();
    let mut base = None;

    if let Some(path) = &args.filter_file {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading filter file {}", path.display()))?;
        let file: FilterFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing filter file {}", path.display()))?;
        base = Some(match file {
            FilterFile::WithAttributes { filter, attributes } => {
                input.attributes = attributes;
                filter
            }
            FilterFile::Model(filter) => filter,
        });
    }

    let mut rows = Vec::with_capacity(args.conditions.len());
    for condition in &args.conditions {
        let row = parse_condition(condition, args.exact)?;
        if let FilterModel::Row {
            attribute,
            predicate: Predicate::From | Predicate::Until,
            ..
        } = &row
        {
            let attr = input.attribute_mut(attribute);
            if attr.kind == AttributeKind::Text {
                *attr = FilterAttribute::date(attr.name.clone());
            }
        }
        rows.push(row);
    }
    for name in &args.range_attributes {
        input.attribute_mut(name).allow_range = true;
    }
    for name in &args.list_attributes {
        input.attribute_mut(name).allow_list = true;
    }

    let operator = if args.any {
        GroupOperator::Or
    } else {
        GroupOperator::And
    };
    input.model = match (base, rows.is_empty()) {
        (base, true) => base,
        (None, false) => Some(FilterModel::group(operator, rows)),
        (Some(base), false) => Some(FilterModel::group(
            GroupOperator::And,
            vec![base, FilterModel::group(operator, rows)],
        )),
    };
    Ok(input)
}

/// Parse `attr=value`, `attr!=value`, `attr>=value` or `attr<=value`.
fn parse_condition(condition: &str, exact: bool) -> anyhow::Result<FilterModel> {
    let Some(eq) = condition.find('=') else {
        bail!("condition '{condition}' has no '='");
    };
    let value = condition[eq + 1..].trim();
    let (attribute, predicate) = match condition[..eq].chars().last() {
        Some('!') => (&condition[..eq - 1], Predicate::IsNot),
        Some('>') => (&condition[..eq - 1], Predicate::From),
        Some('<') => (&condition[..eq - 1], Predicate::Until),
        _ => (&condition[..eq], Predicate::Is),
    };
    let attribute = attribute.trim();
    if attribute.is_empty() {
        bail!("condition '{condition}' has no attribute");
    }

    let search_type = match predicate {
        Predicate::From | Predicate::Until if value.is_empty() => {
            bail!("condition '{condition}' needs a date")
        }
        _ if value.is_empty() => SearchType::BlankField,
        _ if exact => SearchType::ExactMatch,
        _ => SearchType::PartialMatch,
    };
    Ok(FilterModel::row(attribute, predicate, search_type, value))
}
