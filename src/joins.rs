//! Alias allocation and the include (join) graph.
//!
//! The root table is always `e0`. Each include edge, in the order it was
//! added, gets the next alias (`e1`, `e2`, ...) and contributes one
//! `LEFT JOIN` from the source table's foreign-key column to the target's
//! primary key.

use std::collections::HashMap;

use crate::ast::{FieldRef, JoinKey, TableAlias};
use crate::error::{IncludeError, QueryError, SqbResult};
use crate::schema::SchemaCatalog;

/// How an edge was added to the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    /// Source must be the root entity.
    Include,
    /// Source must be an entity joined by an earlier edge.
    ThenInclude,
}

/// One hop in the join graph: a foreign-key field of an already-joined entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeEdge {
    pub kind: IncludeKind,
    /// The foreign-key field. `via` selects which occurrence of the source
    /// entity to join from when it appears more than once.
    pub source: FieldRef,
}

impl IncludeEdge {
    pub fn include(source: impl Into<FieldRef>) -> Self {
        Self {
            kind: IncludeKind::Include,
            source: source.into(),
        }
    }

    pub fn then_include(source: impl Into<FieldRef>) -> Self {
        Self {
            kind: IncludeKind::ThenInclude,
            source: source.into(),
        }
    }

    pub fn key(&self) -> JoinKey {
        JoinKey::new(self.source.entity.clone(), self.source.field.clone())
    }
}

/// A resolved LEFT JOIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub key: JoinKey,
    pub target_entity: String,
    pub table: String,
    pub alias: TableAlias,
    pub source_alias: TableAlias,
    pub fk_column: String,
    pub target_pk_column: String,
}

/// Entity/edge to alias lookup.
///
/// `by_entity` holds the most recent alias of each entity, so a second join
/// of the same entity shadows the first for unqualified selectors. The root
/// entity is the exception: unqualified selectors on it always resolve to
/// `e0`, and its self-joined copies are reached through their edge. Every
/// edge keeps its own entry in `by_edge`, keyed by the foreign-key field and
/// the alias it leaves from.
#[derive(Debug, Clone)]
pub struct AliasMap {
    root: String,
    by_entity: HashMap<String, TableAlias>,
    by_edge: Vec<(JoinKey, String, TableAlias)>,
}

impl AliasMap {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let mut by_entity = HashMap::new();
        by_entity.insert(root.clone(), TableAlias::ROOT);
        Self {
            root,
            by_entity,
            by_edge: Vec::new(),
        }
    }

    /// Record a join of `entity` as `alias` through the pinned edge `key`.
    pub fn assign(&mut self, entity: &str, alias: TableAlias, key: JoinKey) {
        self.by_entity.insert(entity.to_string(), alias);
        self.by_edge.push((key, entity.to_string(), alias));
    }

    /// Most recent alias of `entity`, self-joins of the root included.
    pub fn latest(&self, entity: &str) -> Option<TableAlias> {
        self.by_entity.get(entity).copied()
    }

    /// Alias an unqualified selector on `entity` resolves to.
    pub fn selector(&self, entity: &str) -> Option<TableAlias> {
        if entity == self.root {
            Some(TableAlias::ROOT)
        } else {
            self.latest(entity)
        }
    }

    /// Alias of the most recent table introduced by an edge matching `key`,
    /// if it holds `entity`.
    pub fn through(&self, entity: &str, key: &JoinKey) -> Option<TableAlias> {
        self.by_edge
            .iter()
            .rev()
            .find(|(edge, _, _)| key.matches(edge))
            .filter(|(_, target, _)| target == entity)
            .map(|(_, _, alias)| *alias)
    }

    /// Resolve a field selector.
    pub fn resolve(&self, entity: &str, via: Option<&JoinKey>) -> Option<TableAlias> {
        match via {
            Some(key) => self.through(entity, key),
            None => self.selector(entity),
        }
    }

    /// Resolve the source of a `then_include` hop: the latest join wins.
    pub fn resolve_source(&self, entity: &str, via: Option<&JoinKey>) -> Option<TableAlias> {
        match via {
            Some(key) => self.through(entity, key),
            None => self.latest(entity),
        }
    }
}

/// The root table plus every include edge, with allocated aliases.
#[derive(Debug, Clone)]
pub struct JoinGraph {
    root: String,
    aliases: AliasMap,
    edges: Vec<IncludeEdge>,
    joins: Vec<Join>,
}

impl JoinGraph {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        Self {
            aliases: AliasMap::new(root.clone()),
            root,
            edges: Vec::new(),
            joins: Vec::new(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    pub fn edges(&self) -> &[IncludeEdge] {
        &self.edges
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Every table occurrence in alias order: the root, then each join target.
    pub fn tables(&self) -> impl Iterator<Item = (&str, TableAlias)> {
        std::iter::once((self.root.as_str(), TableAlias::ROOT)).chain(
            self.joins
                .iter()
                .map(|j| (j.target_entity.as_str(), j.alias)),
        )
    }

    /// Alias of the table a field selector refers to.
    pub fn resolve_alias(&self, field: &FieldRef) -> SqbResult<TableAlias> {
        self.aliases
            .resolve(&field.entity, field.via.as_ref())
            .ok_or_else(|| {
                let reason = if field.via.is_some() {
                    "no include edge with that key joins this entity"
                } else {
                    "entity is not part of the query"
                };
                QueryError::unresolved(&field.entity, &field.field, reason)
            })
    }

    /// Append an edge, allocating the next alias.
    ///
    /// Nothing is modified when the edge is rejected.
    pub fn push<C>(&mut self, catalog: &C, edge: IncludeEdge) -> SqbResult<&Join>
    where
        C: SchemaCatalog + ?Sized,
    {
        let source = &edge.source;

        match edge.kind {
            IncludeKind::ThenInclude if self.edges.is_empty() => {
                return Err(IncludeError::NoPriorInclude.into());
            }
            IncludeKind::Include if source.entity != self.root => {
                return Err(IncludeError::NotRoot {
                    root: self.root.clone(),
                    entity: source.entity.clone(),
                }
                .into());
            }
            _ => {}
        }

        let source_alias = match edge.kind {
            IncludeKind::Include => TableAlias::ROOT,
            IncludeKind::ThenInclude => self
                .aliases
                .resolve_source(&source.entity, source.via.as_ref())
                .ok_or_else(|| IncludeError::SourceNotJoined {
                    entity: source.entity.clone(),
                })?,
        };

        let fk = catalog
            .describe(&source.entity)?
            .get_field(&source.field)
            .ok_or_else(|| IncludeError::MissingField {
                entity: source.entity.clone(),
                field: source.field.clone(),
            })?;
        let target_name = fk
            .foreign_key
            .as_deref()
            .ok_or_else(|| IncludeError::MissingForeignKey {
                entity: source.entity.clone(),
                field: source.field.clone(),
            })?;
        let target = catalog.describe(target_name)?;

        let alias = TableAlias(self.joins.len() + 1);
        let key = edge.key().from_alias(source_alias);
        let join = Join {
            key: key.clone(),
            target_entity: target.name.clone(),
            table: target.table.clone(),
            alias,
            source_alias,
            fk_column: fk.column.clone(),
            target_pk_column: target.primary_key_column().to_string(),
        };

        tracing::debug!(
            "Joined {} as {} via {} (from {})",
            join.target_entity,
            alias,
            key,
            source_alias
        );

        self.aliases.assign(&target.name, alias, key);
        self.edges.push(edge);
        self.joins.push(join);
        Ok(&self.joins[self.joins.len() - 1])
    }
}
