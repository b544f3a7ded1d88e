//! Ephemeral loopback listener for the OAuth authorization redirect
//!
//! During login the provider redirects the user's browser to
//! `http://localhost:9876/callback` carrying either a `code` query parameter
//! (success) or an `error`/`error_description` pair (denial). This module
//! runs a single-use TCP listener that captures exactly one of those two
//! outcomes, renders a minimal HTML acknowledgment page so the browser tab
//! reaches a visible terminal state, and tears the port down on every exit
//! path.
//!
//! The listener must be bound *before* the browser is launched; otherwise
//! the redirect can race against a closed port. [`CallbackListener::bind`]
//! and [`CallbackListener::wait`] are split for exactly this reason.

use std::collections::HashMap;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::auth::CALLBACK_PATH;
use crate::error::{BbxError, Result};

/// Acknowledgment page rendered on a successful authorization.
const SUCCESS_PAGE: &str =
    "<html><body><h2>Authorization successful!</h2><p>You can close this tab.</p></body></html>";

// ---------------------------------------------------------------------------
// CallbackListener
// ---------------------------------------------------------------------------

/// A single-use local HTTP listener awaiting the provider redirect.
///
/// The listener delivers at most one of two mutually exclusive completion
/// signals: success with an authorization code, or failure with the
/// provider's denial reason. Binding and waiting are separate steps so the
/// login flow can guarantee the port is open before the browser launches.
///
/// Dropping the listener (on success, denial, or timeout) releases the port.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use bbx::auth::callback::CallbackListener;
/// use bbx::auth::CALLBACK_PORT;
///
/// # async fn example() -> bbx::error::Result<()> {
/// let listener = CallbackListener::bind(CALLBACK_PORT).await?;
/// // ... launch the browser here ...
/// let code = listener.wait(Duration::from_secs(300)).await?;
/// println!("authorization code: {code}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CallbackListener {
    listener: TcpListener,
    port: u16,
}

impl CallbackListener {
    /// Binds the loopback listener on the given port.
    ///
    /// The real login flow always passes [`CALLBACK_PORT`](super::CALLBACK_PORT)
    /// because the redirect URI is fixed; tests may pass `0` to let the OS
    /// assign a free port.
    ///
    /// # Errors
    ///
    /// Returns [`BbxError::Bind`] when the port is already occupied, which
    /// most commonly means a second login is running concurrently.  Any
    /// other bind failure surfaces as [`BbxError::Io`].
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = match TcpListener::bind(("127.0.0.1", port)).await {
            Ok(listener) => listener,
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                return Err(BbxError::Bind(port).into());
            }
            Err(e) => return Err(BbxError::Io(e).into()),
        };
        let port = listener
            .local_addr()
            .map_err(BbxError::Io)?
            .port();
        Ok(Self { listener, port })
    }

    /// The port the listener is actually bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the provider redirect, bounded by `window`.
    ///
    /// Consumes the listener so that the port is released on every exit
    /// path.  Requests for paths other than `/callback` (browser favicon
    /// probes and the like) receive a 404 and do not terminate the wait.
    ///
    /// # Returns
    ///
    /// The authorization `code` delivered by the redirect.
    ///
    /// # Errors
    ///
    /// - [`BbxError::AuthorizationDenied`] when the redirect carries an
    ///   `error` instead of a code.
    /// - [`BbxError::AuthorizationTimeout`] when `window` elapses without
    ///   either signal.
    pub async fn wait(self, window: Duration) -> Result<String> {
        match tokio::time::timeout(window, self.serve()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!("no authorization redirect within {}s", window.as_secs());
                Err(BbxError::AuthorizationTimeout(window.as_secs()).into())
            }
        }
    }

    /// Accepts connections until one of them resolves the flow.
    async fn serve(&self) -> Result<String> {
        loop {
            let (stream, peer) = self.listener.accept().await.map_err(BbxError::Io)?;
            tracing::debug!("callback connection from {peer}");

            match handle_connection(stream).await? {
                Some(outcome) => return outcome.into_result(),
                // Not the redirect (e.g. /favicon.ico); keep waiting.
                None => continue,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Connection handling
// ---------------------------------------------------------------------------

/// The terminal signal extracted from the redirect request.
enum CallbackOutcome {
    Code(String),
    Denied(String),
}

impl CallbackOutcome {
    fn into_result(self) -> Result<String> {
        match self {
            CallbackOutcome::Code(code) => Ok(code),
            CallbackOutcome::Denied(reason) => Err(BbxError::AuthorizationDenied(reason).into()),
        }
    }
}

/// Reads one HTTP request, answers it, and classifies it.
///
/// Returns `Ok(None)` for requests that are not the callback redirect.
async fn handle_connection(stream: TcpStream) -> Result<Option<CallbackOutcome>> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    // First line is the request line; drain the remaining headers up to the
    // blank separator so the browser sees a complete exchange.
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .await
        .map_err(BbxError::Io)?;
    loop {
        let mut header = String::new();
        let n = reader.read_line(&mut header).await.map_err(BbxError::Io)?;
        if n == 0 || header == "\r\n" || header == "\n" {
            break;
        }
    }

    // Request line: "GET /callback?code=... HTTP/1.1"
    let target = request_line.split_whitespace().nth(1).unwrap_or("/");
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    };

    if path != CALLBACK_PATH {
        let _ = write_response(&mut write_half, "404 Not Found", "<html><body>Not found</body></html>").await;
        return Ok(None);
    }

    let params = parse_query_string(query);

    if let Some(code) = params.get("code") {
        let _ = write_response(&mut write_half, "200 OK", SUCCESS_PAGE).await;
        return Ok(Some(CallbackOutcome::Code(code.clone())));
    }

    let reason = params
        .get("error_description")
        .or_else(|| params.get("error"))
        .cloned()
        .unwrap_or_else(|| "no authorization code received".to_string());
    let page = format!(
        "<html><body><h2>Authorization failed</h2><p>{}</p></body></html>",
        html_escape(&reason)
    );
    let _ = write_response(&mut write_half, "200 OK", &page).await;
    Ok(Some(CallbackOutcome::Denied(reason)))
}

/// Writes a minimal HTTP/1.1 response and flushes it.
async fn write_response(
    stream: &mut tokio::net::tcp::OwnedWriteHalf,
    status: &str,
    body: &str,
) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}

// ---------------------------------------------------------------------------
// Utility functions
// ---------------------------------------------------------------------------

/// Parses a URL query string into a key-value map.
///
/// Values are percent-decoded.  Duplicate keys are overwritten by the last
/// occurrence.
fn parse_query_string(query: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for pair in query.split('&') {
        let mut iter = pair.splitn(2, '=');
        let key = iter.next().unwrap_or("").to_string();
        let value = iter.next().unwrap_or("").to_string();
        if !key.is_empty() {
            map.insert(key, percent_decode(&value));
        }
    }
    map
}

/// Performs minimal percent-decoding of a URL query parameter value.
///
/// Converts `+` to space and `%XX` sequences to the corresponding byte.
/// Decoding happens at the byte level so multi-byte UTF-8 sequences survive;
/// the collected bytes are converted once at the end, with invalid sequences
/// replaced rather than rejected.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'+' {
            out.push(b' ');
            i += 1;
        } else if bytes[i] == b'%' && i + 2 < bytes.len() {
            let decoded = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = decoded {
                out.push(byte);
                i += 3;
                continue;
            }
            out.push(bytes[i]);
            i += 1;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Escapes the characters with special meaning in HTML text content.
///
/// The denial reason comes from a URL controlled by the provider redirect,
/// so it must not be interpolated into the acknowledgment page verbatim.
fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // parse_query_string
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_query_string_with_code() {
        let map = parse_query_string("code=abc123");
        assert_eq!(map.get("code"), Some(&"abc123".to_string()));
    }

    #[test]
    fn test_parse_query_string_with_error_pair() {
        let map = parse_query_string("error=access_denied&error_description=denied+by+user");
        assert_eq!(map.get("error"), Some(&"access_denied".to_string()));
        assert_eq!(
            map.get("error_description"),
            Some(&"denied by user".to_string())
        );
    }

    #[test]
    fn test_parse_query_string_empty_returns_empty_map() {
        assert!(parse_query_string("").is_empty());
    }

    #[test]
    fn test_parse_query_string_decodes_percent_encoding() {
        let map = parse_query_string("error_description=user%20cancelled");
        assert_eq!(
            map.get("error_description"),
            Some(&"user cancelled".to_string())
        );
    }

    // -----------------------------------------------------------------------
    // percent_decode
    // -----------------------------------------------------------------------

    #[test]
    fn test_percent_decode_plain_string_unchanged() {
        assert_eq!(percent_decode("hello"), "hello");
    }

    #[test]
    fn test_percent_decode_converts_plus_to_space() {
        assert_eq!(percent_decode("hello+world"), "hello world");
    }

    #[test]
    fn test_percent_decode_hex_sequence() {
        assert_eq!(percent_decode("a%20b"), "a b");
    }

    #[test]
    fn test_percent_decode_multibyte_utf8_sequence() {
        assert_eq!(percent_decode("caf%C3%A9"), "caf\u{e9}");
    }

    #[test]
    fn test_percent_decode_invalid_utf8_is_replaced_not_mangled() {
        // A lone 0xFF is not valid UTF-8; it must become the replacement
        // character instead of the Latin-1 'ÿ'.
        assert_eq!(percent_decode("%FF"), "\u{fffd}");
    }

    #[test]
    fn test_percent_decode_incomplete_percent_passes_through() {
        // A lone '%' without two hex digits should pass through safely.
        let result = percent_decode("%zz");
        assert!(!result.is_empty());
    }

    // -----------------------------------------------------------------------
    // html_escape
    // -----------------------------------------------------------------------

    #[test]
    fn test_html_escape_plain_text_unchanged() {
        assert_eq!(html_escape("denied by user"), "denied by user");
    }

    #[test]
    fn test_html_escape_neutralizes_markup() {
        assert_eq!(
            html_escape("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_html_escape_ampersand_first() {
        assert_eq!(html_escape("a&b"), "a&amp;b");
    }

    // -----------------------------------------------------------------------
    // bind()
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_bind_ephemeral_port_reports_actual_port() {
        let listener = CallbackListener::bind(0).await.expect("bind port 0");
        assert_ne!(listener.port(), 0, "OS must assign a concrete port");
    }

    #[tokio::test]
    async fn test_bind_occupied_port_is_distinct_bind_error() {
        let first = CallbackListener::bind(0).await.expect("first bind");
        let port = first.port();

        let err = CallbackListener::bind(port)
            .await
            .expect_err("second bind on the same port must fail");
        let bbx = err.downcast_ref::<BbxError>().expect("BbxError expected");
        assert!(
            matches!(bbx, BbxError::Bind(p) if *p == port),
            "expected Bind({port}), got: {bbx}"
        );
    }
}
