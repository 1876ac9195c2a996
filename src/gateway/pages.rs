//! Server-rendered HTML for the login flow.
//!
//! The login form posts through HTMX: failures swap an error fragment into
//! `#error`, success is signalled with an `HX-Redirect` header.

/// Fragment returned for any credential failure.
pub const INVALID_CREDENTIALS_FRAGMENT: &str =
    r#"<div id="error" class="error">Invalid username or password</div>"#;

/// Fragment returned when a session could not be issued.
pub const LOGIN_FAILED_FRAGMENT: &str =
    r#"<div id="error" class="error">Login failed. Please try again.</div>"#;

/// Fragment returned when a client exceeds the login attempt limit.
pub const RATE_LIMITED_FRAGMENT: &str =
    r#"<div id="error" class="error">Too many login attempts. Please wait a minute.</div>"#;

fn base_style() -> &'static str {
    r#"
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        background: #f5f5f5; color: #333;
        display: flex; justify-content: center; align-items: center;
        min-height: 100vh; padding: 20px;
    }
    .card {
        background: #fff; border-radius: 12px; padding: 32px;
        max-width: 380px; width: 100%; box-shadow: 0 4px 24px rgba(0,0,0,0.08);
    }
    h1 { font-size: 24px; margin-bottom: 20px; text-align: center; }
    .form-group { margin-bottom: 16px; }
    .form-group label { display: block; font-size: 14px; margin-bottom: 6px; }
    .form-group input {
        width: 100%; padding: 10px 12px; border: 1px solid #ccc;
        border-radius: 8px; font-size: 16px;
    }
    .btn {
        width: 100%; padding: 12px; border: none; border-radius: 8px;
        background: #2f6f4f; color: #fff; font-size: 16px; cursor: pointer;
    }
    .error { background: #fff0f0; color: #c62828; padding: 10px 12px; border-radius: 8px; font-size: 13px; margin-bottom: 16px; }
    .muted { font-size: 13px; color: #777; text-align: center; margin-top: 16px; }
    .muted a { color: #2f6f4f; }
    "#
}

pub fn render_login_page() -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>timelog - Sign in</title>
<script src="https://unpkg.com/htmx.org@1.9.12"></script>
<style>{style}</style>
</head><body>
<div class="card">
  <h1>timelog</h1>
  <div id="error"></div>
  <form hx-post="/login" hx-target="#error" hx-swap="outerHTML">
    <div class="form-group">
      <label for="username">Username</label>
      <input id="username" type="text" name="username" required autocomplete="username">
    </div>
    <div class="form-group">
      <label for="password">Password</label>
      <input id="password" type="password" name="password" required autocomplete="current-password">
    </div>
    <button type="submit" class="btn">Sign in</button>
  </form>
</div>
</body></html>"##,
        style = base_style(),
    )
}

pub fn render_home_page(display_name: &str) -> String {
    let name = escape_html(display_name);
    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>timelog</title>
<style>{style}</style>
</head><body>
<div class="card">
  <h1>Hello, {name}</h1>
  <p class="muted"><a href="/logout">Sign out</a></p>
</div>
</body></html>"#,
        style = base_style(),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_page_posts_via_htmx() {
        let page = render_login_page();
        assert!(page.contains(r#"hx-post="/login""#));
        assert!(page.contains(r#"name="username""#));
        assert!(page.contains(r#"name="password""#));
        assert!(page.contains(r#"id="error""#));
        assert!(page.contains(r##"hx-target="#error""##));
        assert!(page.trim_end().ends_with("</body></html>"));
    }

    #[test]
    fn home_page_escapes_display_name() {
        let page = render_home_page("<script>x</script>");
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>x"));
    }

    #[test]
    fn failure_fragments_are_generic() {
        for fragment in [INVALID_CREDENTIALS_FRAGMENT, LOGIN_FAILED_FRAGMENT] {
            assert!(fragment.starts_with(r#"<div id="error""#));
            assert!(!fragment.to_lowercase().contains("unknown user"));
        }
    }
}
