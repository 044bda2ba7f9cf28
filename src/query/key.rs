use std::fmt;

use crate::api::types::SkillPage;

/// Resource a cache entry belongs to. Invalidation by resource hits every
/// parameter variant of that resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
  Notes,
  Note,
  Skills,
}

/// Structured key of a cache entry: resource plus parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
  /// Notes list, optionally filtered by search text
  Notes { filter: Option<String> },
  /// A single note
  Note { id: u64 },
  /// One page of skills
  Skills { page: u32, limit: u32 },
}

impl QueryKey {
  /// Key for the notes list. Empty search text addresses the unfiltered list,
  /// since both issue the same request.
  pub fn notes(filter: Option<&str>) -> Self {
    Self::Notes {
      filter: filter.filter(|f| !f.is_empty()).map(String::from),
    }
  }

  pub fn note(id: u64) -> Self {
    Self::Note { id }
  }

  pub fn skills(page: SkillPage) -> Self {
    Self::Skills {
      page: page.page,
      limit: page.limit,
    }
  }

  pub fn resource(&self) -> Resource {
    match self {
      Self::Notes { .. } => Resource::Notes,
      Self::Note { .. } => Resource::Note,
      Self::Skills { .. } => Resource::Skills,
    }
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Notes { filter: None } => write!(f, "notes"),
      Self::Notes { filter: Some(q) } => write!(f, "notes[q={}]", q),
      Self::Note { id } => write!(f, "note[{}]", id),
      Self::Skills { page, limit } => write!(f, "skills[page={}, limit={}]", page, limit),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn test_empty_filter_is_unfiltered() {
    assert_eq!(QueryKey::notes(Some("")), QueryKey::notes(None));
  }

  #[test]
  fn test_distinct_parameters_do_not_collide() {
    let keys: HashSet<QueryKey> = [
      QueryKey::notes(None),
      QueryKey::notes(Some("a")),
      QueryKey::notes(Some("A")),
      QueryKey::note(1),
      QueryKey::note(2),
      QueryKey::skills(SkillPage::new(1, 10)),
      QueryKey::skills(SkillPage::new(10, 1)),
    ]
    .into_iter()
    .collect();
    assert_eq!(keys.len(), 7);
  }

  #[test]
  fn test_resource_prefix() {
    assert_eq!(QueryKey::notes(Some("x")).resource(), Resource::Notes);
    assert_eq!(QueryKey::note(9).resource(), Resource::Note);
    assert_eq!(
      QueryKey::skills(SkillPage::new(1, 5)).resource(),
      Resource::Skills
    );
  }

  #[test]
  fn test_display() {
    assert_eq!(QueryKey::notes(Some("todo")).to_string(), "notes[q=todo]");
    assert_eq!(QueryKey::note(4).to_string(), "note[4]");
  }
}
