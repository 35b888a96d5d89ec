use http::Uri;
use std::borrow::Cow;
use std::collections::BTreeMap;
use url::{Url, form_urlencoded};

/// Builds the public URLs the iOS installer uses to call back into the gateway.
///
/// The path of the inbound request is kept, the scheme becomes `https` and the
/// host the configured public hostname. Query parameters are copied (first
/// value only), `plist=true` is forced, and the query is re-encoded with keys in
/// ascending order so that the output does not depend on the inbound order.
#[derive(Clone, Debug)]
pub struct ManifestUrlBuilder {
    base: Url,
}

impl ManifestUrlBuilder {
    pub fn new(public_hostname: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse(&format!("https://{public_hostname}"))?;
        Ok(ManifestUrlBuilder { base })
    }

    /// URL of the installer manifest for the requested build. Embedded in the
    /// landing page.
    pub fn manifest_url(&self, uri: &Uri) -> String {
        self.build(uri, &[])
    }

    /// URL of the binary itself, embedded in the manifest. The `artifact` flag
    /// takes precedence over `plist` when the installer calls back.
    pub fn artifact_url(&self, uri: &Uri) -> String {
        self.build(uri, &[("artifact", "true")])
    }

    fn build(&self, uri: &Uri, forced: &[(&str, &str)]) -> String {
        let mut params: BTreeMap<Cow<'_, str>, Cow<'_, str>> = BTreeMap::new();
        if let Some(query) = uri.query() {
            for (key, value) in form_urlencoded::parse(query.as_bytes()) {
                params.entry(key).or_insert(value);
            }
        }

        params.insert("plist".into(), "true".into());
        for (key, value) in forced {
            params.insert((*key).into(), (*value).into());
        }

        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&params)
            .finish();

        let mut url = self.base.clone();
        url.set_path(uri.path());
        url.set_query(Some(&query));
        url.into()
    }
}
