//! Set-union mergers for tag names and tag values.
//!
//! All four variants are the same routine underneath: classify envelopes,
//! union elements into an ordered set, sum scan metrics. Output lists are
//! strictly sorted with no duplicates.

use crate::classify::{classify_envelopes, Ingested};
use crate::decode::{DecodeError, ResponseDecoder};
use crate::provenance::Provenance;
use std::collections::{BTreeMap, BTreeSet};
use tracefed_types::{
    BackendResponse, SearchMetrics, SearchTagValuesResponse, SearchTagValuesV2Response,
    SearchTagsResponse, SearchTagsV2Response, SearchTagsV2Scope, TagValue,
};

/// Running metric sum that remembers whether any backend reported metrics at
/// all, so an all-silent fan-out emits no metrics object.
#[derive(Default)]
struct MetricsSum {
    total: SearchMetrics,
    seen: bool,
}

impl MetricsSum {
    fn add(&mut self, metrics: &Option<SearchMetrics>) {
        if let Some(metrics) = metrics {
            self.total.accumulate(metrics);
            self.seen = true;
        }
    }

    fn finish(self) -> Option<SearchMetrics> {
        self.seen.then_some(self.total)
    }
}

fn union_merge<T, R, D, I>(
    responses: &[BackendResponse],
    decode: D,
    mut ingest: I,
) -> (BTreeSet<T>, Option<SearchMetrics>, Provenance)
where
    T: Ord,
    D: Fn(&[u8]) -> Result<R, DecodeError>,
    I: FnMut(R, &mut BTreeSet<T>, &mut MetricsSum),
{
    let mut provenance = Provenance::default();
    let mut elements = BTreeSet::new();
    let mut metrics = MetricsSum::default();

    classify_envelopes(responses, &mut provenance, |_, body| {
        let response = decode(body)?;
        ingest(response, &mut elements, &mut metrics);
        // an empty list is still a valid answer
        Ok(Ingested::Content)
    });

    provenance.total_spans = elements.len();
    (elements, metrics.finish(), provenance)
}

/// Union of flat tag names, lexicographically sorted.
pub fn merge_tag_names(
    responses: &[BackendResponse],
    decoder: &dyn ResponseDecoder,
) -> (SearchTagsResponse, Provenance) {
    let (names, metrics, provenance) = union_merge(
        responses,
        |body| decoder.tag_names(body),
        |response: SearchTagsResponse, names, metrics| {
            names.extend(response.tag_names);
            metrics.add(&response.metrics);
        },
    );
    (
        SearchTagsResponse {
            tag_names: names.into_iter().collect(),
            metrics,
        },
        provenance,
    )
}

/// Union of scope-partitioned tag names; scopes emitted sorted by name, tag
/// lists sorted within each scope.
pub fn merge_tag_names_v2(
    responses: &[BackendResponse],
    decoder: &dyn ResponseDecoder,
) -> (SearchTagsV2Response, Provenance) {
    let mut provenance = Provenance::default();
    let mut scopes: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut metrics = MetricsSum::default();

    classify_envelopes(responses, &mut provenance, |_, body| {
        let response = decoder.tag_names_v2(body)?;
        metrics.add(&response.metrics);
        for scope in response.scopes {
            scopes.entry(scope.name).or_default().extend(scope.tags);
        }
        Ok(Ingested::Content)
    });

    provenance.total_spans = scopes.values().map(|tags| tags.len()).sum();
    let response = SearchTagsV2Response {
        scopes: scopes
            .into_iter()
            .map(|(name, tags)| SearchTagsV2Scope {
                name,
                tags: tags.into_iter().collect(),
            })
            .collect(),
        metrics: metrics.finish(),
    };
    (response, provenance)
}

/// Union of flat tag values, lexicographically sorted.
pub fn merge_tag_values(
    responses: &[BackendResponse],
    decoder: &dyn ResponseDecoder,
) -> (SearchTagValuesResponse, Provenance) {
    let (values, metrics, provenance) = union_merge(
        responses,
        |body| decoder.tag_values(body),
        |response: SearchTagValuesResponse, values, metrics| {
            values.extend(response.tag_values);
            metrics.add(&response.metrics);
        },
    );
    (
        SearchTagValuesResponse {
            tag_values: values.into_iter().collect(),
            metrics,
        },
        provenance,
    )
}

/// Union of typed tag values keyed by (type, value); string values first,
/// then the other types, each group sorted.
pub fn merge_tag_values_v2(
    responses: &[BackendResponse],
    decoder: &dyn ResponseDecoder,
) -> (SearchTagValuesV2Response, Provenance) {
    let mut provenance = Provenance::default();
    let mut values: BTreeMap<(u8, String, String), TagValue> = BTreeMap::new();
    let mut metrics = MetricsSum::default();

    classify_envelopes(responses, &mut provenance, |_, body| {
        let response = decoder.tag_values_v2(body)?;
        metrics.add(&response.metrics);
        for value in response.tag_values {
            values.entry(typed_key(&value)).or_insert(value);
        }
        Ok(Ingested::Content)
    });

    provenance.total_spans = values.len();
    let response = SearchTagValuesV2Response {
        tag_values: values.into_values().collect(),
        metrics: metrics.finish(),
    };
    (response, provenance)
}

/// Ordering key for typed values: strings rank ahead of every other type,
/// then (type, value) lexicographically.
fn typed_key(value: &TagValue) -> (u8, String, String) {
    let rank = if value.value_type == "string" { 0 } else { 1 };
    (rank, value.value_type.clone(), value.value.clone())
}
