// ABOUTME: Response rendering helpers
// ABOUTME: JSON responses and the HTML download page listing resolved links

use crate::error::{GatewayError, Result};
use crate::streams::StreamFormat;
use fastly::http::{header, StatusCode};
use fastly::Response;
use std::collections::HashMap;

/// Create a JSON response
pub fn json_response<T: serde::Serialize>(status: StatusCode, body: &T) -> Result<Response> {
    let json = serde_json::to_string(body)
        .map_err(|e| GatewayError::Internal(format!("JSON serialization error: {}", e)))?;
    let mut resp = Response::from_status(status);
    resp.set_header(header::CONTENT_TYPE, "application/json");
    resp.set_body(json);
    Ok(resp)
}

/// Create an HTML response
pub fn html_response(html: String) -> Response {
    let mut resp = Response::from_status(StatusCode::OK);
    resp.set_header(header::CONTENT_TYPE, "text/html; charset=utf-8");
    resp.set_body(html);
    resp
}

/// Build the download page for a file: one anchor for the direct download
/// plus one per transcoded format, ordered by itag for stable output.
/// The title is interpolated as-is into `<title>` and `<h1>`.
pub fn download_page(
    title: &str,
    direct_url: &str,
    formats: &HashMap<String, StreamFormat>,
) -> String {
    let mut links = String::new();
    links.push_str(&format!(
        "        <a class=\"link\" href=\"{}\">Download Direct</a>\n",
        direct_url
    ));

    let mut itags: Vec<&String> = formats.keys().collect();
    itags.sort_by_key(|itag| itag.parse::<u32>().unwrap_or(u32::MAX));
    for itag in itags {
        let format = &formats[itag];
        links.push_str(&format!(
            "        <a class=\"link\" href=\"{}\">Download {}p</a>\n",
            format.url, format.resolution
        ));
    }

    DOWNLOAD_PAGE
        .replace("{title}", title)
        .replace("{links}", links.trim_end())
}

/// Download page template
const DOWNLOAD_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #1a1a2e;
            color: #eee;
            display: flex;
            align-items: center;
            justify-content: center;
            min-height: 100vh;
        }
        .container {
            background: #16213e;
            padding: 2.5rem;
            border-radius: 12px;
            width: 100%;
            max-width: 480px;
            border: 1px solid #0f3460;
            text-align: center;
        }
        h1 { font-size: 1.25rem; color: #fff; margin-bottom: 1.5rem; word-break: break-all; }
        .link {
            display: block;
            padding: 0.75rem 1rem;
            margin-bottom: 0.75rem;
            border: 1px solid #333;
            border-radius: 8px;
            background: #1a1a2e;
            color: #fff;
            text-decoration: none;
        }
        .link:hover { background: #0f3460; border-color: #60a5fa; }
    </style>
</head>
<body>
    <div class="container">
        <h1>{title}</h1>
{links}
    </div>
</body>
</html>"#;
