use reqwest::{RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::trace;

use crate::error::Error;

/// Everything needed to talk to one spreadsheet.
#[derive(Debug, Clone)]
pub struct RequestConfig {
	pub client: reqwest::Client,
	/// Base url of the API, e.g. `https://sheets.googleapis.com`.
	pub api_url: String,
	pub spreadsheet_id: String,
	pub access_token: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
	#[serde(default)]
	values: Vec<Vec<Value>>,
}

/// Thin client over the `spreadsheets.values` endpoints.
#[derive(Debug, Clone)]
pub struct SheetsClient {
	client: reqwest::Client,
	spreadsheet_url: Url,
	access_token: String,
}

impl SheetsClient {
	pub fn new(config: RequestConfig) -> Result<Self, Error> {
		let invalid = |reason: &str| Error::InvalidUrl {
			url: config.api_url.clone(),
			reason: reason.to_string(),
		};

		let mut spreadsheet_url =
			Url::parse(&config.api_url).map_err(|e| invalid(&e.to_string()))?;
		spreadsheet_url
			.path_segments_mut()
			.map_err(|()| invalid("not a base url"))?
			.pop_if_empty()
			.extend(["v4", "spreadsheets", config.spreadsheet_id.as_str()]);

		Ok(Self {
			client: config.client,
			spreadsheet_url,
			access_token: config.access_token,
		})
	}

	fn url(&self, segments: &[&str]) -> Url {
		let mut url = self.spreadsheet_url.clone();
		// checked to be a base url on construction
		if let Ok(mut path) = url.path_segments_mut() {
			path.extend(segments);
		}
		url
	}

	async fn send(&self, request: RequestBuilder) -> Result<Response, Error> {
		let response = request.bearer_auth(&self.access_token).send().await?;
		let status = response.status();
		trace!(%status, url = %response.url(), "Sheets api response");

		if status.is_success() {
			return Ok(response);
		}

		let body = response.text().await.unwrap_or_default();
		Err(Error::Status { status, body })
	}

	pub(crate) fn get_request(&self, range: &str) -> RequestBuilder {
		self.client
			.get(self.url(&["values", range]))
			.query(&[("valueRenderOption", "FORMATTED_VALUE")])
	}

	pub(crate) fn append_request(&self, range: &str, rows: &[Vec<String>]) -> RequestBuilder {
		self.client
			.post(self.url(&["values", &format!("{range}:append")]))
			.query(&[
				("valueInputOption", "USER_ENTERED"),
				("insertDataOption", "INSERT_ROWS"),
			])
			.json(&json!({ "values": rows }))
	}

	pub(crate) fn batch_update_request(&self, data: &[(String, &[String])]) -> RequestBuilder {
		let data = data
			.iter()
			.map(|(range, values)| json!({ "range": range, "values": [values] }))
			.collect::<Vec<_>>();

		self.client
			.post(self.url(&["values:batchUpdate"]))
			.json(&json!({ "valueInputOption": "USER_ENTERED", "data": data }))
	}

	pub(crate) fn update_request(&self, range: &str, rows: &[Vec<String>]) -> RequestBuilder {
		self.client
			.put(self.url(&["values", range]))
			.query(&[("valueInputOption", "USER_ENTERED")])
			.json(&json!({ "values": rows }))
	}

	/// Cells of `range`, rows first. Trailing empty cells and rows are not returned by
	/// the API, so rows may be ragged.
	pub async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, Error> {
		let body = self
			.send(self.get_request(range))
			.await?
			.json::<ValueRange>()
			.await?;

		Ok(body
			.values
			.into_iter()
			.map(|row| row.into_iter().map(cell_to_string).collect())
			.collect())
	}

	/// Inserts `rows` after the last row of the table found at `range`.
	pub async fn append_values(&self, range: &str, rows: &[Vec<String>]) -> Result<(), Error> {
		self.send(self.append_request(range, rows)).await?;
		Ok(())
	}

	/// Writes each `(range, row)` pair in a single request.
	pub async fn batch_update_values(&self, data: &[(String, &[String])]) -> Result<(), Error> {
		self.send(self.batch_update_request(data)).await?;
		Ok(())
	}

	pub async fn update_values(&self, range: &str, rows: &[Vec<String>]) -> Result<(), Error> {
		self.send(self.update_request(range, rows)).await?;
		Ok(())
	}
}

fn cell_to_string(cell: Value) -> String {
	match cell {
		Value::String(s) => s,
		Value::Null => String::new(),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn client() -> SheetsClient {
		SheetsClient::new(RequestConfig {
			client: reqwest::Client::new(),
			api_url: "https://sheets.example.com/".to_string(),
			spreadsheet_id: "abc123".to_string(),
			access_token: "token".to_string(),
		})
		.unwrap()
	}

	fn body(request: &reqwest::Request) -> Value {
		serde_json::from_slice(request.body().and_then(reqwest::Body::as_bytes).unwrap()).unwrap()
	}

	#[test]
	fn rejects_unusable_api_url() {
		assert!(matches!(
			SheetsClient::new(RequestConfig {
				client: reqwest::Client::new(),
				api_url: "not a url".to_string(),
				spreadsheet_id: "abc123".to_string(),
				access_token: String::new(),
			}),
			Err(Error::InvalidUrl { .. })
		));
	}

	#[test]
	fn read_targets_the_quoted_sheet() {
		let request = client().get_request("'Grupo Alpha'").build().unwrap();

		assert_eq!(request.method(), &reqwest::Method::GET);
		assert_eq!(
			request.url().as_str(),
			"https://sheets.example.com/v4/spreadsheets/abc123/values/'Grupo%20Alpha'?valueRenderOption=FORMATTED_VALUE"
		);
	}

	#[test]
	fn append_inserts_rows() {
		let rows = vec![vec!["a".to_string(), "b".to_string()]];
		let request = client().append_request("'Alpha'!A1", &rows).build().unwrap();

		assert_eq!(request.url().path(), "/v4/spreadsheets/abc123/values/'Alpha'!A1:append");
		assert_eq!(
			request.url().query(),
			Some("valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS")
		);
		assert_eq!(body(&request), json!({ "values": [["a", "b"]] }));
	}

	#[test]
	fn batch_update_sends_one_range_per_row() {
		let first = ["x".to_string(), "y".to_string()];
		let second = ["z".to_string()];
		let request = client()
			.batch_update_request(&[
				("'Alpha'!A2:B2".to_string(), &first[..]),
				("'Alpha'!A9:A9".to_string(), &second[..]),
			])
			.build()
			.unwrap();

		assert_eq!(request.url().path(), "/v4/spreadsheets/abc123/values:batchUpdate");
		assert_eq!(
			body(&request),
			json!({
				"valueInputOption": "USER_ENTERED",
				"data": [
					{ "range": "'Alpha'!A2:B2", "values": [["x", "y"]] },
					{ "range": "'Alpha'!A9:A9", "values": [["z"]] },
				],
			})
		);
	}

	#[test]
	fn cells_become_strings() {
		assert_eq!(cell_to_string(json!("12/03/2024")), "12/03/2024");
		assert_eq!(cell_to_string(json!(42)), "42");
		assert_eq!(cell_to_string(json!(true)), "true");
		assert_eq!(cell_to_string(Value::Null), "");
	}
}
