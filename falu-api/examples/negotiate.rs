use falu_api::{Client, FaluApiError, Request, RequestOptions, endpoints::realtime::RealtimePurpose};

#[tokio::main]
pub async fn main() -> Result<(), FaluApiError> {
    let client = Client::new("api_key").with_options(RequestOptions::new().live(false));

    let req = Request::realtime().negotiate(RealtimePurpose::Events);

    let _res = client.send(req).await?;
    Ok(())
}
