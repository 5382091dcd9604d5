use crate::bucket::DateBucket;
use crate::config::Config;
use crate::{ConfigError, HarvestError};
use url::Url;

/// Builds the first-page request URL for a bucket
///
/// Only the first request of a bucket is built locally. Every later page
/// follows the server's `Link` header verbatim.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base_url: Url,
    search_field: String,
    sort: String,
    page_size: u32,
}

impl QueryBuilder {
    /// Creates a builder from the effective configuration
    ///
    /// # Returns
    ///
    /// * `Ok(QueryBuilder)` - Ready to build URLs
    /// * `Err(HarvestError::Config)` - The base URL does not parse
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let base_url = Url::parse(&config.api.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

        Ok(Self {
            base_url,
            search_field: config.api.search_field.clone(),
            sort: config.api.sort.clone(),
            page_size: config.harvest.page_size,
        })
    }

    /// Renders the search expression for a bucket
    ///
    /// # Examples
    ///
    /// ```
    /// use food_event_harvester::{Config, DateBucket, parse_ymd};
    /// use food_event_harvester::harvester::QueryBuilder;
    ///
    /// let builder = QueryBuilder::from_config(&Config::default()).unwrap();
    /// let bucket = DateBucket::new(parse_ymd("20000101").unwrap(), parse_ymd("20000131").unwrap()).unwrap();
    /// assert_eq!(builder.search_expression(&bucket), "date_started:[20000101 TO 20000131]");
    /// ```
    pub fn search_expression(&self, bucket: &DateBucket) -> String {
        format!(
            "{}:[{} TO {}]",
            self.search_field,
            bucket.start_ymd(),
            bucket.end_ymd()
        )
    }

    /// The URL of a bucket's first page
    ///
    /// Carries the search range, page size, and sort order. The API key is
    /// attached by the transport, not here.
    pub fn first_page_url(&self, bucket: &DateBucket) -> String {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("search", &self.search_expression(bucket));
            query.append_pair("limit", &self.page_size.to_string());
            if !self.sort.trim().is_empty() {
                query.append_pair("sort", &self.sort);
            }
        }
        url.to_string()
    }
}
