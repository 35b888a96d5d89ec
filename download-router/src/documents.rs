//! Documents served to iOS devices for over-the-air installation.
//!
//! The landing page links to the `itms-services` scheme, which makes the device
//! fetch the manifest; the manifest in turn points the installer at the binary.

use url::form_urlencoded;

/// Renders the OTA installation manifest (an XML property list) for `build_name`
/// whose package is downloaded from `url`.
pub fn render_manifest(url: &str, build_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>items</key>
  <array>
    <dict>
      <key>assets</key>
      <array>
        <dict>
          <key>kind</key>
          <string>software-package</string>
          <key>url</key>
          <string>{url}</string>
        </dict>
      </array>
      <key>metadata</key>
      <dict>
        <key>kind</key>
        <string>software</string>
        <key>title</key>
        <string>{title}</string>
      </dict>
    </dict>
  </array>
</dict>
</plist>
"#,
        url = cdata(url),
        title = escape(build_name),
    )
}

/// Renders the page that hands the manifest at `url` to the device installer.
pub fn render_landing_page(url: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(url.as_bytes()).collect();
    let install_link = format!("itms-services://?action=download-manifest&url={encoded}");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Install application</title>
</head>
<body>
  <p><a id="install" href="{href}">Tap here to install the application</a></p>
  <script>window.location.href = document.getElementById("install").href;</script>
</body>
</html>
"#,
        href = escape(&install_link),
    )
}

// Keeps the query string byte-identical inside the document.
fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
