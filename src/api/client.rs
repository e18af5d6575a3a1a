use std::collections::HashMap;

use anyhow::Context;
use log::{debug, error};
use reqwest::blocking::Client;
use serde_json::Value;

use crate::graph::{CommunityId, RawGraph, Recommendation, TopKAll};
use crate::util::model_stem;

use super::MetricRecord;
use super::error::{ApiError, Result};
use super::parse;

/// `(category, query)` pairs sent as the query string of graph requests.
pub type FilterQuery = [(String, String)];

/// Blocking client for the recommendation service. Cheap to clone into worker threads.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        let http = Client::builder()
            .build()
            .map_err(|source| ApiError::Transport {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn get_text(&self, path: &str, query: &FilterQuery) -> Result<(String, String)> {
        let url = self.url(path);
        debug!("GET {url} with {} query pairs", query.len());

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .map_err(|source| {
                error!("request to {url} failed: {source}");
                ApiError::Transport {
                    url: url.clone(),
                    source,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("{url} answered with HTTP {status}");
            return Err(ApiError::Status { url, status });
        }

        let body = response.text().map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;
        Ok((url, body))
    }

    fn get_json(&self, path: &str, query: &FilterQuery) -> Result<(String, Value)> {
        let (url, body) = self.get_text(path, query)?;
        let value = serde_json::from_str(&body)
            .context("response is not JSON")
            .map_err(|source| ApiError::Decode {
                url: url.clone(),
                source,
            })?;
        Ok((url, value))
    }

    pub fn datasets(&self) -> Result<Vec<String>> {
        let (_, value) = self.get_json("get_available_datasets", &[])?;
        Ok(parse::parse_string_list(&value, "datasets"))
    }

    pub fn features(&self, dataset: &str) -> Result<Vec<String>> {
        let (_, value) = self.get_json(&format!("get_features/{dataset}"), &[])?;
        Ok(parse::parse_string_list(&value, "fields"))
    }

    pub fn models(&self, dataset: &str) -> Result<Vec<String>> {
        let (_, value) = self.get_json(&format!("get_dataset_models/{dataset}"), &[])?;
        Ok(parse::parse_string_list(&value, "models"))
    }

    /// Base user-item graph restricted by the given filters.
    pub fn interaction_graph(&self, dataset: &str, filters: &FilterQuery) -> Result<RawGraph> {
        let (url, body) = self.get_text(&format!("get_inter_graph/{dataset}/"), filters)?;
        parse::parse_gexf(&body).map_err(|source| ApiError::Decode { url, source })
    }

    pub fn topk_all(&self, dataset: &str, model: &str, k: usize) -> Result<TopKAll> {
        let model = model_stem(model);
        let (_, value) = self.get_json(&format!("get_topk_all/{dataset}/{model}/{k}"), &[])?;
        Ok(parse::parse_topk_all(&value))
    }

    pub fn topk_for_user(
        &self,
        dataset: &str,
        model: &str,
        k: usize,
        user_id: &str,
    ) -> Result<Vec<Recommendation>> {
        let model = model_stem(model);
        let (_, value) = self.get_json(
            &format!("get_topk_uid/{dataset}/{model}/{k}/{user_id}"),
            &[],
        )?;
        Ok(parse::parse_user_topk(&value))
    }

    /// Labels of the user's `k` most recent interactions.
    pub fn interaction_history(&self, dataset: &str, k: usize, user_id: &str) -> Result<Vec<String>> {
        let (_, value) = self.get_json(
            &format!("get_interaction_history_k/{dataset}/{k}/{user_id}"),
            &[],
        )?;
        Ok(parse::parse_history(&value))
    }

    pub fn communities(
        &self,
        dataset: &str,
        filters: &FilterQuery,
    ) -> Result<HashMap<String, CommunityId>> {
        let (_, value) = self.get_json(&format!("get_louvain/{dataset}/"), filters)?;
        Ok(parse::parse_communities(&value))
    }

    pub fn similarity_metrics(
        &self,
        dataset: &str,
        models: (&str, &str),
        k: usize,
        users: (&str, &str),
    ) -> Result<MetricRecord> {
        let path = format!(
            "calculate_user_similarity_metrics/{dataset}/{}/{}/{k}/{}/{}",
            model_stem(models.0),
            model_stem(models.1),
            users.0,
            users.1
        );
        let (url, value) = self.get_json(&path, &[])?;
        parse::parse_metrics(&value).map_err(|message| ApiError::Remote { url, message })
    }

    pub fn graph_similarity_metrics(&self, dataset: &str, users: (&str, &str)) -> Result<MetricRecord> {
        let path = format!(
            "get_user_interaction_graph_similarity_metrics/{dataset}/{}/{}",
            users.0, users.1
        );
        let (url, value) = self.get_json(&path, &[])?;
        parse::parse_metrics(&value).map_err(|message| ApiError::Remote { url, message })
    }
}
