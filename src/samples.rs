use serde::Serialize;

use crate::config::MemberFormat;

/// One slow request as stored in the sorted set.
///
/// The member string is `<route>\n<elapsed secs, 3 decimals>`, optionally
/// followed by `\n<request id>`; the score is the request's start time in
/// Unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlowSample {
    pub route: String,
    pub elapsed_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub started_at: f64,
}

impl SlowSample {
    pub fn member(&self, format: MemberFormat) -> String {
        match (format, &self.request_id) {
            (MemberFormat::WithRequestId, Some(id)) => {
                format!("{}\n{:.3}\n{}", self.route, self.elapsed_secs, id)
            }
            _ => format!("{}\n{:.3}", self.route, self.elapsed_secs),
        }
    }

    /// Reads a stored member back. Returns `None` for members this crate
    /// did not write.
    pub fn parse(member: &str, score: f64) -> Option<Self> {
        let mut parts = member.split('\n');
        let route = parts.next().filter(|r| !r.is_empty())?;
        let elapsed_secs = parts.next()?.parse().ok()?;
        let request_id = parts.next().map(String::from);
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            route: route.to_owned(),
            elapsed_secs,
            request_id,
            started_at: score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(request_id: Option<&str>) -> SlowSample {
        SlowSample {
            route: "app.view".into(),
            elapsed_secs: 2.5,
            request_id: request_id.map(String::from),
            started_at: 1_000_000_000.0,
        }
    }

    #[test]
    fn compat_member_has_three_decimals() {
        assert_eq!(sample(None).member(MemberFormat::Compat), "app.view\n2.500");
        // The id is ignored in compat layout.
        assert_eq!(sample(Some("r1")).member(MemberFormat::Compat), "app.view\n2.500");
    }

    #[test]
    fn request_id_member_appends_id() {
        assert_eq!(
            sample(Some("4f2a")).member(MemberFormat::WithRequestId),
            "app.view\n2.500\n4f2a"
        );
    }

    #[test]
    fn parse_reads_both_layouts() {
        let compat = SlowSample::parse("app.view\n2.500", 1_000_000_000.0).unwrap();
        assert_eq!(compat, sample(None));

        let tagged = SlowSample::parse("app.view\n2.500\n4f2a", 1_000_000_000.0).unwrap();
        assert_eq!(tagged.request_id.as_deref(), Some("4f2a"));
    }

    #[test]
    fn parse_rejects_foreign_members() {
        assert!(SlowSample::parse("just-a-string", 1.0).is_none());
        assert!(SlowSample::parse("app.view\nslow", 1.0).is_none());
        assert!(SlowSample::parse("\n1.000", 1.0).is_none());
        assert!(SlowSample::parse("a\n1.0\nb\nc", 1.0).is_none());
    }
}
