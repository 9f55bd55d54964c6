//! Query filter grammar.
//!
//! List filters arrive as query values where `,` separates OR groups and
//! ` AND ` joins the terms of a group: `a AND b,c` reads `(a and b) or c`.
//! Values are parsed into [`OrList`] / [`AndList`] before any filtering
//! happens, so the storage side never sees the raw grammar.

use crate::{ContractId, ContractTag, InterfaceId};
use serde::{Deserialize, Serialize};

const OR_SEPARATOR: char = ',';
const AND_SEPARATOR: &str = " AND ";

/// Disjunction of terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrList<T>(pub Vec<T>);

/// Conjunction of terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndList<T>(pub Vec<T>);

impl<T> Default for OrList<T> {
	fn default() -> Self {
		Self(Vec::new())
	}
}

impl<T> OrList<T> {
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn map<U>(self, f: impl Fn(T) -> U) -> OrList<U> {
		OrList(self.0.into_iter().map(f).collect())
	}
}

impl<T: PartialEq> OrList<T> {
	/// Empty lists do not constrain anything.
	pub fn matches(&self, value: &T) -> bool {
		self.0.is_empty() || self.0.contains(value)
	}
}

impl<T: PartialEq> OrList<AndList<T>> {
	/// True when every term of at least one group is present in `values`.
	/// Empty lists do not constrain anything.
	pub fn matches_all_of_any(&self, values: &[T]) -> bool {
		self.0.is_empty()
			|| self
				.0
				.iter()
				.any(|group| group.0.iter().all(|term| values.contains(term)))
	}
}

/// Parses `a,b,c` into an OR list, dropping blank terms.
pub fn parse_or_list(value: Option<&str>) -> OrList<String> {
	OrList(
		value
			.unwrap_or_default()
			.split(OR_SEPARATOR)
			.map(str::trim)
			.filter(|term| !term.is_empty())
			.map(str::to_string)
			.collect(),
	)
}

/// Parses `a AND b,c` into an OR list of AND lists, dropping blank terms
/// and empty groups.
pub fn parse_or_list_with_nested_and_lists(value: Option<&str>) -> OrList<AndList<String>> {
	OrList(
		parse_or_list(value)
			.0
			.into_iter()
			.map(|group| {
				AndList(
					group
						.split(AND_SEPARATOR)
						.map(str::trim)
						.filter(|term| !term.is_empty())
						.map(str::to_string)
						.collect::<Vec<_>>(),
				)
			})
			.filter(|group| !group.0.is_empty())
			.collect(),
	)
}

/// Filters applied when listing deployment requests of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractDeploymentRequestFilters {
	pub contract_ids: OrList<ContractId>,
	pub contract_tags: OrList<AndList<ContractTag>>,
	pub contract_implements: OrList<AndList<InterfaceId>>,
	pub deployed_only: bool,
}

impl ContractDeploymentRequestFilters {
	pub fn parse(
		contract_ids: Option<&str>,
		contract_tags: Option<&str>,
		contract_implements: Option<&str>,
		deployed_only: bool,
	) -> Self {
		Self {
			contract_ids: parse_or_list(contract_ids).map(ContractId),
			contract_tags: parse_or_list_with_nested_and_lists(contract_tags)
				.map(|group| AndList(group.0.into_iter().map(ContractTag).collect())),
			contract_implements: parse_or_list_with_nested_and_lists(contract_implements)
				.map(|group| AndList(group.0.into_iter().map(InterfaceId).collect())),
			deployed_only,
		}
	}
}

/// Filters applied when listing contract decorators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractDecoratorFilters {
	pub contract_tags: OrList<AndList<ContractTag>>,
	pub contract_implements: OrList<AndList<InterfaceId>>,
}

impl ContractDecoratorFilters {
	pub fn parse(contract_tags: Option<&str>, contract_implements: Option<&str>) -> Self {
		Self {
			contract_tags: parse_or_list_with_nested_and_lists(contract_tags)
				.map(|group| AndList(group.0.into_iter().map(ContractTag).collect())),
			contract_implements: parse_or_list_with_nested_and_lists(contract_implements)
				.map(|group| AndList(group.0.into_iter().map(InterfaceId).collect())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_or_list() {
		assert_eq!(
			parse_or_list(Some("a, b,,c")).0,
			vec!["a".to_string(), "b".to_string(), "c".to_string()]
		);
		assert!(parse_or_list(None).is_empty());
		assert!(parse_or_list(Some("")).is_empty());
	}

	#[test]
	fn test_parse_nested_and_lists() {
		let parsed = parse_or_list_with_nested_and_lists(Some("a AND b,c"));

		assert_eq!(
			parsed,
			OrList(vec![
				AndList(vec!["a".to_string(), "b".to_string()]),
				AndList(vec!["c".to_string()]),
			])
		);
	}

	#[test]
	fn test_matches_all_of_any() {
		let filter = parse_or_list_with_nested_and_lists(Some("a AND b,c"));

		assert!(filter.matches_all_of_any(&["a".to_string(), "b".to_string()]));
		assert!(filter.matches_all_of_any(&["c".to_string()]));
		assert!(!filter.matches_all_of_any(&["a".to_string()]));
		assert!(!filter.matches_all_of_any(&[]));

		let empty: OrList<AndList<String>> = OrList::default();
		assert!(empty.matches_all_of_any(&[]));
	}

	#[test]
	fn test_deployment_filters() {
		let filters = ContractDeploymentRequestFilters::parse(
			Some("examples.a,examples.b"),
			Some("example AND simple"),
			None,
			true,
		);

		assert!(filters.contract_ids.matches(&ContractId::new("examples.b")));
		assert!(!filters.contract_ids.matches(&ContractId::new("examples.c")));
		assert!(filters.contract_tags.matches_all_of_any(&[
			ContractTag::new("simple"),
			ContractTag::new("example"),
		]));
		assert!(filters.contract_implements.is_empty());
		assert!(filters.deployed_only);
	}
}
