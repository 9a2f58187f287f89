//! Normalization of exported project objects into [`ProjectRecord`]s.
//!
//! Two steps: [`read_raw_project`] validates one loosely-typed JSON object
//! into a [`RawProject`], applying the truthiness rules of the export (empty
//! strings, `0`, `false` and `null` all count as absent), and
//! [`project_record`] derives the stored record from it.

use serde_json::Value;

use crate::config::LabelsConfig;
use crate::models::{
    FileKind, LinkKind, ProjectFile, ProjectLink, ProjectRecord, RawProject, AUTHOR_ID,
};

/// Validate one element of the input array.
///
/// Never fails: anything unusable becomes `None`/empty, and a non-object
/// element yields a `RawProject` without a `uid` (which the pipeline skips).
pub fn read_raw_project(value: Value) -> RawProject {
    let Some(obj) = value.as_object() else {
        return RawProject {
            original: value,
            ..RawProject::default()
        };
    };

    let member_names = obj
        .get("teamInfo")
        .and_then(|team| team.get("members"))
        .and_then(Value::as_array)
        .map(|members| {
            members
                .iter()
                .filter_map(|m| m.get("name").and_then(Value::as_str))
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let images = obj
        .get("images")
        .and_then(Value::as_array)
        .map(|images| {
            images
                .iter()
                .map(|img| img.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    RawProject {
        uid: truthy_text(obj.get("uid")),
        title: truthy_text(obj.get("title")),
        summary: truthy_text(obj.get("summary")),
        text_content: truthy_text(obj.get("textContent")),
        member_names,
        representative_image: truthy_text(obj.get("representativeImage")),
        images,
        git_repository: truthy_text(obj.get("gitRepository")),
        presentation_url: truthy_text(obj.get("presentationUrl")),
        video_url: truthy_text(obj.get("videoUrl")),
        like_count: parse_count(obj.get("likeCount")),
        comment_count: parse_count(obj.get("commentCount")),
        url: obj.get("url").cloned().unwrap_or(Value::Null),
        original: value,
    }
}

/// Derive the stored record. Callers check `raw.uid` first; the record
/// itself does not carry its key.
pub fn project_record(raw: &RawProject, labels: &LabelsConfig) -> ProjectRecord {
    let files = raw
        .images
        .iter()
        .enumerate()
        .filter_map(|(idx, url)| url.as_ref().map(|url| (idx, url)))
        .map(|(idx, url)| ProjectFile {
            file_id: format!("img-{}", idx),
            kind: FileKind::Image,
            filename: format!("{} {}", labels.image, idx + 1),
            url: url.clone(),
        })
        .collect();

    ProjectRecord {
        title: raw
            .title
            .clone()
            .unwrap_or_else(|| labels.untitled.clone()),
        subtitle: labels.subtitle.clone(),
        content: raw
            .summary
            .clone()
            .or_else(|| raw.text_content.clone())
            .unwrap_or_default(),
        keywords: raw.member_names.clone(),
        thumbnail: raw.representative_image.clone().unwrap_or_default(),
        files,
        links: project_links(raw, labels),
        author_id: AUTHOR_ID.to_string(),
        like_count: raw.like_count,
        comment_count: raw.comment_count,
        source_url: raw.url.clone(),
        original_data: raw.original.clone(),
    }
}

/// Links in fixed order: repository, presentation, video.
fn project_links(raw: &RawProject, labels: &LabelsConfig) -> Vec<ProjectLink> {
    let candidates = [
        (&raw.git_repository, "git", LinkKind::Github, &labels.github),
        (
            &raw.presentation_url,
            "presentation",
            LinkKind::Link,
            &labels.presentation,
        ),
        (&raw.video_url, "video", LinkKind::Youtube, &labels.video),
    ];

    candidates
        .into_iter()
        .filter_map(|(url, link_id, kind, title)| {
            url.as_ref().map(|url| ProjectLink {
                link_id: link_id.to_string(),
                kind,
                title: title.clone(),
                url: url.clone(),
            })
        })
        .collect()
}

/// Text of a truthy scalar: non-empty strings, non-zero numbers, `true`.
fn truthy_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Count fields: integers pass through, strings use a leading-integer parse,
/// everything else is 0. Negative values clamp to 0.
pub fn parse_count(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i.max(0)
            } else if n.as_u64().is_some() {
                i64::MAX
            } else {
                match n.as_f64() {
                    // `as` saturates at i64::MAX
                    Some(f) if f.is_finite() && f >= 1.0 => f.trunc() as i64,
                    _ => 0,
                }
            }
        }
        Some(Value::String(s)) => parse_leading_int(s),
        _ => 0,
    }
}

/// Integer prefix of `s`, the way the export's producers read counts:
/// leading whitespace skipped, optional sign, optional `0x` prefix, then
/// digits up to the first non-digit. No digits or a negative sign gives 0.
pub fn parse_leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = match rest.get(..2) {
        Some("0x") | Some("0X") => (16, &rest[2..]),
        _ => (10, rest),
    };

    let mut value: i64 = 0;
    let mut seen = false;
    for c in digits.chars() {
        let Some(d) = c.to_digit(radix) else { break };
        seen = true;
        value = value
            .saturating_mul(i64::from(radix))
            .saturating_add(i64::from(d));
    }

    if !seen || negative {
        0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels() -> LabelsConfig {
        LabelsConfig::default()
    }

    fn record(value: Value) -> ProjectRecord {
        project_record(&read_raw_project(value), &labels())
    }

    #[test]
    fn scenario_two_images_and_repository() {
        let raw = read_raw_project(json!({
            "uid": "p1",
            "title": "Demo",
            "images": ["a.png", "b.png"],
            "gitRepository": "https://github.com/x/y"
        }));
        assert_eq!(raw.uid.as_deref(), Some("p1"));

        let rec = project_record(&raw, &labels());
        assert_eq!(rec.title, "Demo");
        assert_eq!(rec.files.len(), 2);
        assert_eq!(rec.files[0].file_id, "img-0");
        assert_eq!(rec.files[1].file_id, "img-1");
        assert_eq!(rec.files[0].filename, "이미지 1");
        assert_eq!(rec.files[1].filename, "이미지 2");
        assert!(rec.files.iter().all(|f| f.kind == FileKind::Image));
        assert_eq!(rec.links.len(), 1);
        assert_eq!(rec.links[0].kind, LinkKind::Github);
        assert_eq!(rec.links[0].link_id, "git");
        assert_eq!(rec.author_id, AUTHOR_ID);
    }

    #[test]
    fn file_ids_follow_source_position() {
        let rec = record(json!({
            "uid": "p",
            "images": ["a.png", "", "b.png"]
        }));
        let files: Vec<(&str, &str, &str)> = rec
            .files
            .iter()
            .map(|f| (f.file_id.as_str(), f.filename.as_str(), f.url.as_str()))
            .collect();
        assert_eq!(
            files,
            vec![
                ("img-0", "이미지 1", "a.png"),
                ("img-1", "이미지 2", ""),
                ("img-2", "이미지 3", "b.png"),
            ]
        );
    }

    #[test]
    fn non_string_images_skipped_without_renumbering() {
        let rec = record(json!({
            "uid": "p",
            "images": ["a.png", {"src": "x"}, 7, "b.png"]
        }));
        let ids: Vec<&str> = rec.files.iter().map(|f| f.file_id.as_str()).collect();
        assert_eq!(ids, vec!["img-0", "img-3"]);
        assert_eq!(rec.files[1].filename, "이미지 4");
        assert_eq!(rec.files[1].url, "b.png");
    }

    #[test]
    fn links_keep_fixed_order_and_skip_missing() {
        let rec = record(json!({
            "uid": "p2",
            "videoUrl": "https://youtu.be/v",
            "gitRepository": "https://github.com/x/y"
        }));
        let kinds: Vec<LinkKind> = rec.links.iter().map(|l| l.kind).collect();
        assert_eq!(kinds, vec![LinkKind::Github, LinkKind::Youtube]);

        let all = record(json!({
            "uid": "p3",
            "videoUrl": "v",
            "presentationUrl": "p",
            "gitRepository": "g"
        }));
        let ids: Vec<&str> = all.links.iter().map(|l| l.link_id.as_str()).collect();
        assert_eq!(ids, vec!["git", "presentation", "video"]);
        assert_eq!(all.links[1].title, "발표자료");
    }

    #[test]
    fn empty_link_sources_are_omitted() {
        let rec = record(json!({
            "uid": "p",
            "gitRepository": "",
            "presentationUrl": null,
            "videoUrl": false
        }));
        assert!(rec.links.is_empty());
    }

    #[test]
    fn defaults_when_fields_missing() {
        let rec = record(json!({"uid": "bare"}));
        assert_eq!(rec.title, "제목 없음");
        assert_eq!(rec.subtitle, "소프트콘 프로젝트");
        assert_eq!(rec.content, "");
        assert!(rec.keywords.is_empty());
        assert_eq!(rec.thumbnail, "");
        assert!(rec.files.is_empty());
        assert!(rec.links.is_empty());
        assert_eq!(rec.like_count, 0);
        assert_eq!(rec.comment_count, 0);
        assert!(rec.source_url.is_null());
        assert_eq!(rec.original_data, json!({"uid": "bare"}));
    }

    #[test]
    fn content_prefers_summary_then_text_content() {
        let both = record(json!({"uid": "a", "summary": "s", "textContent": "t"}));
        assert_eq!(both.content, "s");

        let text_only = record(json!({"uid": "a", "summary": "", "textContent": "t"}));
        assert_eq!(text_only.content, "t");
    }

    #[test]
    fn keywords_are_member_names_in_order() {
        let rec = record(json!({
            "uid": "a",
            "teamInfo": {"members": [
                {"name": "Kim"},
                {"role": "lead"},
                {"name": ""},
                {"name": "Lee"}
            ]}
        }));
        assert_eq!(rec.keywords, vec!["Kim".to_string(), "Lee".to_string()]);
    }

    #[test]
    fn counts_parse_leading_integer() {
        let rec = record(json!({"uid": "a", "likeCount": "42", "commentCount": "abc"}));
        assert_eq!(rec.like_count, 42);
        assert_eq!(rec.comment_count, 0);

        let numeric = record(json!({"uid": "a", "likeCount": 7, "commentCount": 2.9}));
        assert_eq!(numeric.like_count, 7);
        assert_eq!(numeric.comment_count, 2);

        let nulls = record(json!({"uid": "a", "likeCount": null, "commentCount": true}));
        assert_eq!(nulls.like_count, 0);
        assert_eq!(nulls.comment_count, 0);
    }

    #[test]
    fn leading_int_edge_cases() {
        assert_eq!(parse_leading_int("  12abc"), 12);
        assert_eq!(parse_leading_int("+5"), 5);
        assert_eq!(parse_leading_int("-5"), 0);
        assert_eq!(parse_leading_int("0x1A"), 26);
        assert_eq!(parse_leading_int(""), 0);
        assert_eq!(parse_leading_int("3.99"), 3);
        assert_eq!(parse_leading_int("99999999999999999999999"), i64::MAX);
    }

    #[test]
    fn negative_numbers_clamp_to_zero() {
        assert_eq!(parse_count(Some(&json!(-3))), 0);
        assert_eq!(parse_count(Some(&json!(-3.5))), 0);
    }

    #[test]
    fn uid_truthiness() {
        assert_eq!(read_raw_project(json!({"uid": ""})).uid, None);
        assert_eq!(read_raw_project(json!({"uid": null})).uid, None);
        assert_eq!(read_raw_project(json!({"uid": 0})).uid, None);
        assert_eq!(
            read_raw_project(json!({"uid": 1024})).uid.as_deref(),
            Some("1024")
        );
        assert_eq!(read_raw_project(json!("not an object")).uid, None);
    }

    #[test]
    fn source_url_is_verbatim() {
        let rec = record(json!({"uid": "a", "url": "https://softcon.ajou.ac.kr/works/works.asp?uid=1"}));
        assert_eq!(
            rec.source_url,
            json!("https://softcon.ajou.ac.kr/works/works.asp?uid=1")
        );
    }
}
