use oilsight_core::{
    filter_by_parent, DashboardError, Loadable, Notice, ReferenceRecord, ReferenceSet, Sample,
    Selection,
};
use tracing::{debug, info, warn};

use crate::{parse_reference_list, parse_samples, Endpoint, ReferenceSource};

/// Outcome of loading every reference list for one form session.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceLoad {
    pub reference: ReferenceSet,
    /// One warning per list that could not be loaded.
    pub notices: Vec<Notice>,
}

/// Fetches the reference lists a cascading form needs.
///
/// Failures never escape: a list that cannot be fetched or parsed becomes an
/// empty list plus a [`Notice`] for the caller to show.
pub struct ReferenceLoader<S> {
    source: S,
}

impl<S: ReferenceSource> ReferenceLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch organizations, sites, assets, sampling points and users concurrently.
    pub async fn load_all(&self) -> ReferenceLoad {
        let (organizations, sites, assets, sampling_points, users) = futures::join!(
            self.load(Endpoint::Organizations),
            self.load(Endpoint::Sites),
            self.load(Endpoint::Assets),
            self.load(Endpoint::SamplingPoints),
            self.load(Endpoint::Users),
        );

        let mut notices = Vec::new();
        let reference = ReferenceSet {
            organizations: settle(Endpoint::Organizations, organizations, &mut notices),
            sites: settle(Endpoint::Sites, sites, &mut notices),
            assets: settle(Endpoint::Assets, assets, &mut notices),
            sampling_points: settle(Endpoint::SamplingPoints, sampling_points, &mut notices),
            users: settle(Endpoint::Users, users, &mut notices),
        };

        info!(failed = notices.len(), "reference data loaded");
        ReferenceLoad { reference, notices }
    }

    /// Fetch and parse one reference list, surfacing the error.
    pub async fn load(&self, endpoint: Endpoint) -> Result<Vec<ReferenceRecord>, DashboardError> {
        debug!(%endpoint, "fetching reference list");
        let value = self.source.fetch_json(endpoint).await?;
        parse_reference_list(&value)
    }

    /// Samples taken at `sampling_point` (every sample when nothing is selected).
    pub async fn load_samples(&self, sampling_point: &Selection) -> (Vec<Sample>, Option<Notice>) {
        let result = match self.source.fetch_json(Endpoint::Samples).await {
            Ok(value) => parse_samples(&value),
            Err(err) => Err(err),
        };

        match result {
            Ok(samples) => {
                let matching: Vec<Sample> = filter_by_parent(
                    &samples,
                    |sample| sample.sampling_point.as_ref().map(|p| p.id.as_str()),
                    sampling_point,
                )
                .into_iter()
                .cloned()
                .collect();
                (matching, None)
            }
            Err(err) => {
                warn!(endpoint = %Endpoint::Samples, error = %err, "sample history unavailable");
                (Vec::new(), Some(failure_notice(Endpoint::Samples, &err)))
            }
        }
    }
}

fn settle(
    endpoint: Endpoint,
    result: Result<Vec<ReferenceRecord>, DashboardError>,
    notices: &mut Vec<Notice>,
) -> Loadable<Vec<ReferenceRecord>> {
    match result {
        Ok(records) => Loadable::Ready(records),
        Err(err) => {
            warn!(%endpoint, error = %err, "reference list unavailable");
            notices.push(failure_notice(endpoint, &err));
            Loadable::Ready(Vec::new())
        }
    }
}

fn failure_notice(endpoint: Endpoint, err: &DashboardError) -> Notice {
    Notice::warning(format!("Could not load {}: {err}", endpoint.label()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use oilsight_core::{CascadeForm, CascadeLevel, CascadeState, NoticeLevel};
    use serde_json::{json, Value};

    use super::*;

    #[derive(Default)]
    struct FakeSource {
        responses: HashMap<Endpoint, Value>,
    }

    impl FakeSource {
        fn with(mut self, endpoint: Endpoint, value: Value) -> Self {
            self.responses.insert(endpoint, value);
            self
        }
    }

    #[async_trait]
    impl ReferenceSource for FakeSource {
        async fn fetch_json(&self, endpoint: Endpoint) -> Result<Value, DashboardError> {
            self.responses
                .get(&endpoint)
                .cloned()
                .ok_or(DashboardError::Http {
                    status: 503,
                    message: "unavailable".into(),
                })
        }
    }

    fn backend() -> FakeSource {
        FakeSource::default()
            .with(Endpoint::Organizations, json!([{"id": "o1"}]))
            .with(
                Endpoint::Sites,
                json!([{"id": "s1", "organization": "o1"}, {"id": "s2", "organization": "o1"}]),
            )
            .with(
                Endpoint::Assets,
                json!({"data": [
                    {"id": "a1", "parent_site": {"id": "s1"}},
                    {"id": "a2", "parent_site": {"id": "s2"}}
                ]}),
            )
            .with(
                Endpoint::SamplingPoints,
                json!([{"id": "p1", "parent_asset": {"id": "a1"}}]),
            )
            .with(Endpoint::Users, json!([{"id": "u1", "email": "a@b.c"}]))
    }

    #[tokio::test]
    async fn loads_every_list() {
        let loader = ReferenceLoader::new(backend());
        let load = loader.load_all().await;

        assert!(load.notices.is_empty());
        assert!(load.reference.is_complete());

        let mut form = CascadeForm::new(load.reference, CascadeState::new());
        form.select(CascadeLevel::Site, Selection::from("s1"));
        let assets: Vec<String> = form
            .options(CascadeLevel::Asset)
            .into_iter()
            .map(|o| o.value)
            .collect();
        assert_eq!(assets, vec!["a1"]);
    }

    #[tokio::test]
    async fn failed_list_becomes_empty_with_notice() {
        let mut source = backend();
        source.responses.remove(&Endpoint::Assets);
        source
            .responses
            .insert(Endpoint::Users, json!({"detail": "forbidden"}));

        let load = ReferenceLoader::new(source).load_all().await;

        assert_eq!(load.notices.len(), 2);
        assert!(load
            .notices
            .iter()
            .all(|notice| notice.level == NoticeLevel::Warning));
        assert!(load.notices[0].message.contains("assets"));
        assert_eq!(load.reference.assets, Loadable::Ready(Vec::new()));
        assert_eq!(load.reference.users, Loadable::Ready(Vec::new()));
        assert_eq!(
            load.reference.sites.ready().map(Vec::len),
            Some(2)
        );
    }

    #[tokio::test]
    async fn samples_are_narrowed_to_sampling_point() {
        let source = backend().with(
            Endpoint::Samples,
            json!([
                {"id": "x1", "date_sampled": 1709280000, "sampling_point": {"id": "p1"}},
                {"id": "x2", "date_sampled": 1709280000, "sampling_point": {"id": "p2"}},
                {"id": "x3", "date_sampled": 1709280000}
            ]),
        );
        let loader = ReferenceLoader::new(source);

        let (samples, notice) = loader.load_samples(&Selection::from("p1")).await;
        assert!(notice.is_none());
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].id, "x1");

        let (all, _) = loader.load_samples(&Selection::None).await;
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn missing_samples_give_notice() {
        let loader = ReferenceLoader::new(backend());
        let (samples, notice) = loader.load_samples(&Selection::None).await;
        assert!(samples.is_empty());
        let notice = notice.expect("notice");
        assert!(notice.message.starts_with("Could not load samples"));
    }
}
