//! Compound-document building: resolving relationship pointers of the
//! primary data into full resources for the `included` section.
//!
//! Traversal is breadth first over an explicit worklist, with a visited
//! set keyed on `id@type`, so cyclic relationship graphs terminate and
//! every resource appears at most once. When the query names include
//! paths (`"author.boss"`) only those paths are walked; an absent
//! include resolves the full relationship closure.

use std::collections::{BTreeMap, HashSet};

use futures::future::try_join_all;
use tracing::debug;

use crate::adapter::ResourceAdapter;
use crate::error::ApiError;
use crate::query::{Context, Query};
use crate::resource::Resource;

impl ResourceAdapter {
    /// Resolve the `included` resources for one response.
    ///
    /// `roots` is the primary data after sparse-field projection; the
    /// returned resources are projected with the same field whitelists.
    pub(crate) async fn build_included(
        &self,
        roots: &[Resource],
        query: &Query,
        context: &Context,
    ) -> Result<Vec<Resource>, ApiError> {
        // `include=` with no paths asks for nothing at all.
        if matches!(&query.include, Some(paths) if paths.is_empty()) {
            return Ok(Vec::new());
        }
        let mut paths: Option<Vec<Vec<String>>> = query.include.as_ref().map(|paths| {
            paths
                .iter()
                .map(|path| path.split('.').map(str::to_string).collect())
                .collect()
        });

        let mut found: HashSet<String> = roots.iter().map(Resource::key).collect();
        let mut included: Vec<Resource> = Vec::new();

        let fetch_query = Query {
            fields: query.fields.clone(),
            ..Query::default()
        };

        let mut frontier = collect_wanted(roots, paths.as_deref(), &found);
        while !frontier.is_empty() {
            let fetches = frontier.iter().map(|(type_name, ids)| {
                self.call_get_resource_collection(type_name, ids, &fetch_query, context)
            });
            let batches = try_join_all(fetches).await?;
            debug!(
                types = frontier.len(),
                resources = batches.iter().map(Vec::len).sum::<usize>(),
                "Resolved include layer"
            );

            let layer: Vec<Resource> = batches
                .into_iter()
                .flatten()
                .map(|resource| resource.project(&query.fields))
                .collect();
            for resource in &layer {
                found.insert(resource.key());
            }

            paths = shift_paths(paths);
            frontier = collect_wanted(&layer, paths.as_deref(), &found);
            included.extend(layer);
        }
        Ok(included)
    }
}

/// Group the not-yet-seen relationship pointers of `resources` by type,
/// honoring the path whitelist when one is present.
fn collect_wanted(
    resources: &[Resource],
    paths: Option<&[Vec<String>]>,
    found: &HashSet<String>,
) -> BTreeMap<String, Vec<String>> {
    let mut wanted: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for resource in resources {
        for (name, data) in &resource.relationships {
            let allowed = match paths {
                Some(paths) => paths.iter().any(|path| path.first() == Some(name)),
                None => true,
            };
            if !allowed {
                continue;
            }
            for pointer in data.pointers() {
                if found.contains(&pointer.key()) {
                    continue;
                }
                let ids = wanted.entry(pointer.type_name.clone()).or_default();
                if !ids.contains(&pointer.id) {
                    ids.push(pointer.id.clone());
                }
            }
        }
    }
    wanted
}

/// Drop the leading segment of every path; exhausted paths fall away.
fn shift_paths(paths: Option<Vec<Vec<String>>>) -> Option<Vec<Vec<String>>> {
    paths.map(|paths| {
        paths
            .into_iter()
            .filter(|path| path.len() > 1)
            .map(|path| path[1..].to_vec())
            .collect()
    })
}
