use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use interface::{Quote, SourceError};

use crate::PriceSource;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_VS_CURRENCY: &str = "usd";

#[derive(Clone)]
pub struct CoinGeckoClient {
    http: reqwest::Client,
    base_url: String,
    vs_currency: String,
}

impl CoinGeckoClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, DEFAULT_VS_CURRENCY)
    }

    pub fn with_base_url(base_url: &str, vs_currency: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            vs_currency: vs_currency.to_lowercase(),
        }
    }

    pub fn vs_currency(&self) -> &str {
        &self.vs_currency
    }

    fn simple_price_url(&self, assets: &[String]) -> String {
        format!(
            "{}/simple/price?ids={}&vs_currencies={}&include_market_cap=true&include_24hr_vol=false&include_24hr_change=true",
            self.base_url,
            assets.join(","),
            self.vs_currency
        )
    }
}

impl Default for CoinGeckoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    async fn fetch_quotes(&self, assets: &[String]) -> Result<Vec<Quote>, SourceError> {
        if assets.is_empty() {
            return Ok(Vec::new());
        }

        let response = self.http.get(self.simple_price_url(assets)).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        let body: Value = response.json().await?;
        debug!("coingecko response: {}", body);

        parse_simple_price(body, &self.vs_currency)
    }
}

/// `simple/price` 응답을 자산별 Quote로 변환
///
/// 응답 형식: `{ "bitcoin": { "usd": 1.0, "usd_market_cap": 2.0, "usd_24h_change": 3.0 } }`
/// 필드가 없거나 숫자가 아닌 자산은 경고만 남기고 건너뜁니다.
pub fn parse_simple_price(body: Value, vs_currency: &str) -> Result<Vec<Quote>, SourceError> {
    let entries: HashMap<String, Value> = match body {
        Value::Object(map) => map.into_iter().collect(),
        other => {
            return Err(SourceError::Malformed(format!(
                "expected an object keyed by asset, got {}",
                other
            )))
        }
    };

    let price_key = vs_currency.to_string();
    let market_cap_key = format!("{vs_currency}_market_cap");
    let change_key = format!("{vs_currency}_24h_change");

    let mut out = Vec::with_capacity(entries.len());

    for (asset, data) in entries {
        let field = |key: &str| data.get(key).and_then(Value::as_f64);

        let (price, market_cap, change_24h) =
            match (field(&price_key), field(&market_cap_key), field(&change_key)) {
                (Some(p), Some(m), Some(c)) => (p, m, c),
                _ => {
                    warn!(asset = %asset, payload = %data, "incomplete quote, skipping asset");
                    continue;
                }
            };

        out.push(Quote {
            asset,
            price,
            market_cap,
            change_24h,
        });
    }

    // HashMap 순서는 매번 다르므로 자산 이름으로 정렬
    out.sort_by(|a, b| a.asset.cmp(&b.asset));

    Ok(out)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn tracked() -> Vec<String> {
        ["bitcoin", "matic-network", "ethereum"]
            .iter()
            .map(|a| a.to_string())
            .collect()
    }

    #[test]
    fn test_coingecko_client_name() {
        let client = CoinGeckoClient::new();
        assert_eq!(client.name(), "coingecko");
        assert_eq!(client.vs_currency(), "usd");
    }

    #[test]
    fn test_simple_price_url() {
        let client = CoinGeckoClient::with_base_url("http://localhost:9999/api/v3/", "USD");
        let url = client.simple_price_url(&["bitcoin".to_string(), "ethereum".to_string()]);

        assert_eq!(
            url,
            "http://localhost:9999/api/v3/simple/price?ids=bitcoin,ethereum&vs_currencies=usd&include_market_cap=true&include_24hr_vol=false&include_24hr_change=true"
        );
    }

    #[test]
    fn test_parse_simple_price() {
        let body = json!({
            "bitcoin": {
                "usd": 67012.0,
                "usd_market_cap": 1.32e12,
                "usd_24h_change": -1.53
            },
            "ethereum": {
                "usd": 2630.4,
                "usd_market_cap": 3.16e11,
                "usd_24h_change": 0.81
            }
        });

        let quotes = parse_simple_price(body, "usd").unwrap();

        assert_eq!(quotes.len(), 2);
        assert_eq!(
            quotes[0],
            Quote {
                asset: "bitcoin".to_string(),
                price: 67012.0,
                market_cap: 1.32e12,
                change_24h: -1.53,
            }
        );
        assert_eq!(quotes[1].asset, "ethereum");
        assert_eq!(quotes[1].price, 2630.4);
    }

    #[test]
    fn test_parse_skips_incomplete_asset() {
        let body = json!({
            "bitcoin": { "usd": 67012.0, "usd_market_cap": 1.32e12, "usd_24h_change": -1.53 },
            "matic-network": { "usd": 0.38, "usd_24h_change": 2.0 },
            "ethereum": { "usd": "2630.4", "usd_market_cap": 3.16e11, "usd_24h_change": 0.81 }
        });

        let quotes = parse_simple_price(body, "usd").unwrap();

        // matic은 market cap 누락, ethereum은 가격이 문자열
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].asset, "bitcoin");
    }

    #[test]
    fn test_parse_other_vs_currency() {
        let body = json!({
            "bitcoin": { "eur": 61000.0, "eur_market_cap": 1.2e12, "eur_24h_change": 0.5 }
        });

        assert_eq!(parse_simple_price(body.clone(), "eur").unwrap().len(), 1);
        assert!(parse_simple_price(body, "usd").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_non_object() {
        let result = parse_simple_price(json!(["bitcoin"]), "usd");
        assert!(matches!(result, Err(SourceError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_empty_asset_list_skips_request() {
        // 연결할 수 없는 주소라도 요청 자체를 보내지 않아야 함
        let client = CoinGeckoClient::with_base_url("http://127.0.0.1:1", "usd");
        let quotes = client.fetch_quotes(&[]).await.unwrap();
        assert!(quotes.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_source_is_error() {
        let client = CoinGeckoClient::with_base_url("http://127.0.0.1:1", "usd");
        let result = client.fetch_quotes(&["bitcoin".to_string()]).await;
        assert!(matches!(result, Err(SourceError::Http(_))));
    }

    #[tokio::test]
    async fn test_fetch_quotes_server_error_is_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = CoinGeckoClient::with_base_url(&server.uri(), "usd");
        let result = client.fetch_quotes(&tracked()).await;

        match result {
            Err(SourceError::Status(status)) => assert_eq!(status.as_u16(), 503),
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_quotes_invalid_json_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
            .mount(&server)
            .await;

        let client = CoinGeckoClient::with_base_url(&server.uri(), "usd");
        assert!(client.fetch_quotes(&tracked()).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_quotes_skips_incomplete_asset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .and(query_param("ids", "bitcoin,matic-network,ethereum"))
            .and(query_param("vs_currencies", "usd"))
            .and(query_param("include_market_cap", "true"))
            .and(query_param("include_24hr_change", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "bitcoin": { "usd": 67012.0, "usd_market_cap": 1.32e12, "usd_24h_change": -1.53 },
                "matic-network": { "usd": 0.38, "usd_24h_change": 2.0 },
                "ethereum": { "usd": 2630.4, "usd_market_cap": 3.16e11, "usd_24h_change": 0.81 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CoinGeckoClient::with_base_url(&server.uri(), "usd");
        let quotes = client.fetch_quotes(&tracked()).await.unwrap();

        let assets: Vec<&str> = quotes.iter().map(|q| q.asset.as_str()).collect();
        assert_eq!(assets, vec!["bitcoin", "ethereum"]);
        assert_eq!(quotes[1].market_cap, 3.16e11);
    }
}
