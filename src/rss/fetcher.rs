//! Feed retrieval and decoding.
//!
//! `RssFetcher` performs one HTTP GET per call with bounded timeouts and a
//! bounded body size, then decodes the payload. RSS channels are read with
//! the `rss` crate so `pubDate` text reaches the ingester untouched; other
//! formats go through feed-rs and have their timestamps rendered back to
//! RFC 2822.

use std::future::Future;
use std::io::Cursor;
use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::config::FetcherConfig;
use crate::rss::types::{ParsedFeed, ParsedItem};
use crate::{GatorError, Result};

/// Something that can turn a feed URL into a decoded document.
///
/// The scheduler is generic over this so tests can substitute canned documents
/// and failures for the network.
pub trait FeedSource: Send + Sync {
    /// Retrieve and decode the document at `url`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<ParsedFeed>> + Send;
}

/// HTTP feed fetcher.
pub struct RssFetcher {
    client: Client,
    max_feed_size: u64,
    max_description_length: usize,
    allow_private_hosts: bool,
}

impl RssFetcher {
    /// Build a fetcher from configuration.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| GatorError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
            max_description_length: config.max_description_length,
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        validate_feed_url(url, self.allow_private_hosts)?;

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatorError::Network(format!("failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatorError::Network(format!("HTTP {} from {}", status, url)));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(self.too_large(content_length));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| GatorError::Network(format!("failed to read {}: {}", url, e)))?
        {
            let received = (body.len() + chunk.len()) as u64;
            if received > self.max_feed_size {
                return Err(self.too_large(received));
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url, bytes = body.len(), "downloaded feed");
        Ok(body)
    }

    fn too_large(&self, size: u64) -> GatorError {
        GatorError::Network(format!(
            "feed too large: {} bytes (max {} bytes)",
            size, self.max_feed_size
        ))
    }
}

impl FeedSource for RssFetcher {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        let body = self.download(url).await?;
        parse_feed(&body, self.max_description_length)
    }
}

fn validate_scheme(url: &str) -> Result<url::Url> {
    let parsed =
        url::Url::parse(url).map_err(|e| GatorError::Validation(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(GatorError::Validation(format!(
            "unsupported URL scheme: {}",
            scheme
        ))),
    }
}

/// Validate a feed URL, skipping the host checks when private hosts are allowed.
pub fn validate_feed_url(url: &str, allow_private_hosts: bool) -> Result<()> {
    if allow_private_hosts {
        validate_scheme(url).map(|_| ())
    } else {
        validate_url(url)
    }
}

/// Validate a feed URL against SSRF.
///
/// The scheme must be http or https and the host must not be a loopback,
/// private or reserved address or an internal-looking hostname.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed = validate_scheme(url)?;

    let host = parsed
        .host()
        .ok_or_else(|| GatorError::Validation("URL has no host".to_string()))?;

    let ip = match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(GatorError::Validation(format!("forbidden host: {}", domain)));
            }
            return Ok(());
        }
        url::Host::Ipv4(v4) => IpAddr::V4(v4),
        url::Host::Ipv6(v6) => IpAddr::V6(v6),
    };

    if is_private_ip(&ip) {
        return Err(GatorError::Validation(format!(
            "private IP address not allowed: {}",
            ip
        )));
    }
    Ok(())
}

const FORBIDDEN_SUFFIXES: &[&str] = &[
    ".local",
    ".localhost",
    ".internal",
    ".intranet",
    ".corp",
    ".home",
    ".lan",
];

fn is_forbidden_hostname(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "localhost" || FORBIDDEN_SUFFIXES.iter().any(|s| host.ends_with(s))
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // Documentation ranges
                || (a, b, c) == (192, 0, 2)
                || (a, b, c) == (198, 51, 100)
                || (a, b, c) == (203, 0, 113)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // Unique local fc00::/7
                || (first & 0xfe00) == 0xfc00
                // Link-local fe80::/10
                || (first & 0xffc0) == 0xfe80
        }
    }
}

/// Decode a syndication document.
///
/// Descriptions are stripped of HTML and cut to `max_description_length`
/// characters.
pub fn parse_feed(bytes: &[u8], max_description_length: usize) -> Result<ParsedFeed> {
    match rss::Channel::read_from(Cursor::new(bytes)) {
        Ok(channel) => Ok(from_rss_channel(channel, max_description_length)),
        Err(rss_err) => {
            debug!(error = %rss_err, "not an RSS channel, trying feed-rs");
            let feed = feed_rs::parser::parse(bytes)
                .map_err(|e| GatorError::Decode(format!("failed to parse feed: {}", e)))?;
            Ok(from_feed_rs(feed, max_description_length))
        }
    }
}

fn from_rss_channel(channel: rss::Channel, max_description_length: usize) -> ParsedFeed {
    let items = channel
        .items()
        .iter()
        .map(|item| {
            let description = item
                .description()
                .or_else(|| item.content())
                .map(|d| truncate(&strip_html(d), max_description_length))
                .unwrap_or_default();

            ParsedItem::new(
                item.title().unwrap_or_default().trim(),
                item.link().unwrap_or_default().trim(),
            )
            .with_description(description)
            .with_pub_date(item.pub_date().unwrap_or_default().trim())
        })
        .collect();

    ParsedFeed {
        title: channel.title().trim().to_string(),
        link: channel.link().trim().to_string(),
        description: strip_html(channel.description()),
        items,
    }
}

fn from_feed_rs(feed: feed_rs::model::Feed, max_description_length: usize) -> ParsedFeed {
    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let title = entry.title.map(|t| t.content).unwrap_or_default();
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();
            let description = entry
                .summary
                .map(|t| t.content)
                .or(entry.content.and_then(|c| c.body))
                .map(|d| truncate(&strip_html(&d), max_description_length))
                .unwrap_or_default();
            let pub_date = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.to_rfc2822())
                .unwrap_or_default();

            ParsedItem::new(title.trim(), link.trim())
                .with_description(description)
                .with_pub_date(pub_date)
        })
        .collect();

    ParsedFeed {
        title: feed.title.map(|t| t.content).unwrap_or_default(),
        link: feed.links.first().map(|l| l.href.clone()).unwrap_or_default(),
        description: feed
            .description
            .map(|d| strip_html(&d.content))
            .unwrap_or_default(),
        items,
    }
}

/// Remove tags, decode common entities and collapse whitespace.
fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(ch) = rest.chars().next() {
        match ch {
            '<' => {
                rest = match rest.find('>') {
                    Some(end) => &rest[end + 1..],
                    None => "",
                };
                // Tags separate words
                text.push(' ');
                continue;
            }
            '&' => {
                if let Some(end) = rest[1..].find(';').filter(|&end| end <= 10) {
                    let name = &rest[1..end + 1];
                    if let Some(decoded) = decode_entity(name) {
                        text.push(decoded);
                        rest = &rest[end + 2..];
                        continue;
                    }
                }
                text.push('&');
            }
            _ => text.push(ch),
        }
        rest = &rest[ch.len_utf8()..];
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or(name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
