//! Server-rendered HTML pages.

use core::fmt::{self, Write};
use model::{FixedOffset, Question};

/// Escapes text for inclusion in HTML bodies and quoted attributes.
pub struct Escape<'a>(pub &'a str);

impl fmt::Display for Escape<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.0;
        while let Some(pos) = rest.find(['<', '>', '&', '"', '\'']) {
            let (safe, tail) = rest.split_at(pos);
            f.write_str(safe)?;
            let mut chars = tail.chars();
            f.write_str(match chars.next() {
                Some('<') => "&lt;",
                Some('>') => "&gt;",
                Some('&') => "&amp;",
                Some('"') => "&quot;",
                _ => "&#39;",
            })?;
            rest = chars.as_str();
        }
        f.write_str(rest)
    }
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\
<html lang=\"en\">\
<head>\
<meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
<title>{}</title>\
<link rel=\"stylesheet\" href=\"/static/style.css\">\
</head>\
<body>{body}</body>\
</html>",
        Escape(title)
    )
}

fn write_timestamp(out: &mut String, question: &Question, offset: FixedOffset) {
    let local = question.local_timestamp(offset);
    let _ = write!(out, "<time datetime=\"{}\">{}</time>", local.to_rfc3339(), local.format("%Y-%m-%d %H:%M"));
}

pub fn index() -> String {
    page(
        "Ask Me Anything",
        "<main>\
<h1>Ask Me Anything</h1>\
<p>Got a question? Send it in anonymously.</p>\
<a class=\"button\" href=\"/ask\">Ask a question</a> \
<a class=\"button\" href=\"/answered_questions\">Read the answers</a>\
<button id=\"play-button\" type=\"button\">&#9658;</button>\
<audio id=\"background-music\" src=\"/static/music.mp3\" loop></audio>\
</main>\
<script src=\"/static/scripts.js\"></script>",
    )
}

pub fn ask(submitted: bool) -> String {
    let notice = if submitted { "<p class=\"notice\">Your question has been submitted!</p>" } else { "" };
    page(
        "Ask a question",
        &format!(
            "<main>\
<h1>Ask a question</h1>\
{notice}\
<form method=\"post\" action=\"/ask\">\
<textarea name=\"question\" rows=\"4\" required></textarea>\
<button type=\"submit\">Submit</button>\
</form>\
<a href=\"/\">Back</a>\
</main>"
        ),
    )
}

pub fn admin(user: &str) -> String {
    page(
        "Admin",
        &format!(
            "<main>\
<h1>Welcome, {}</h1>\
<ul>\
<li><a href=\"/questions\">All questions</a></li>\
<li><a href=\"/answered_questions\">Answered questions</a></li>\
</ul>\
</main>",
            Escape(user)
        ),
    )
}

/// Listing of every question, each with an answer form and a share link.
pub fn questions(questions: &[Question], offset: FixedOffset) -> String {
    let mut body = String::from("<main><h1>Questions</h1>");
    if questions.is_empty() {
        body.push_str("<p>No questions yet.</p>");
    }

    body.push_str("<ul class=\"questions\">");
    for question in questions {
        let id = Escape(&question.id);
        let _ = write!(body, "<li><p class=\"content\">{}</p>", Escape(&question.content));
        write_timestamp(&mut body, question, offset);
        if let Some(answer) = question.answer.as_deref() {
            let _ = write!(body, "<p class=\"answer\">{}</p>", Escape(answer));
        }
        let _ = write!(
            body,
            "<form method=\"post\" action=\"/answer_question/{id}\">\
<textarea name=\"answer\" rows=\"2\" required></textarea>\
<button type=\"submit\">{}</button>\
</form>\
<a href=\"/questions/{id}\">Share</a></li>",
            if question.is_answered() { "Update answer" } else { "Answer" }
        );
    }
    body.push_str("</ul><a href=\"/admin\">Back</a></main>");
    page("Questions", &body)
}

/// A single question laid out for a screenshot.
pub fn share(question: &Question, offset: FixedOffset) -> String {
    let mut body = format!("<main><article id=\"card\"><p class=\"content\">{}</p>", Escape(&question.content));
    write_timestamp(&mut body, question, offset);
    if let Some(answer) = question.answer.as_deref() {
        let _ = write!(body, "<p class=\"answer\">{}</p>", Escape(answer));
    }
    body.push_str(
        "</article>\
<button id=\"save-image\" type=\"button\">Save screenshot</button>\
<a id=\"image-link\" hidden>Open screenshot</a>\
<a href=\"/questions\">Back</a>\
</main>\
<script src=\"https://cdn.jsdelivr.net/npm/html2canvas@1.4.1/dist/html2canvas.min.js\"></script>\
<script src=\"/static/share.js\"></script>",
    );
    page("Share", &body)
}

pub fn answered(questions: &[Question], offset: FixedOffset) -> String {
    let mut body = String::from("<main><h1>Answered questions</h1><ul class=\"questions\">");
    for question in questions {
        let _ = write!(body, "<li><p class=\"content\">{}</p>", Escape(&question.content));
        write_timestamp(&mut body, question, offset);
        let answer = question.answer.as_deref().unwrap_or_default();
        let _ = write!(body, "<p class=\"answer\">{}</p></li>", Escape(answer));
    }
    body.push_str("</ul><a href=\"/\">Back</a></main>");
    page("Answered questions", &body)
}

#[cfg(test)]
mod tests {
    use super::{ask, questions, Escape};
    use chrono::{TimeZone, Utc};
    use model::{FixedOffset, Question};

    #[test]
    fn escapes_markup() {
        assert_eq!(Escape("<a href=\"x\">Tom & 'Jerry'</a>").to_string(), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;");
        assert_eq!(Escape("plain").to_string(), "plain");
        assert_eq!(Escape("héllo <wörld>").to_string(), "héllo &lt;wörld&gt;");
    }

    #[test]
    fn ask_shows_notice_only_when_submitted() {
        assert!(ask(true).contains("submitted"));
        assert!(!ask(false).contains("submitted"));
    }

    #[test]
    fn listing_escapes_and_localizes() {
        let question = Question {
            id: "q1".into(),
            content: "<script>alert(1)</script>".into(),
            answer: Some("42".into()),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 22, 15, 0).unwrap(),
        };
        let html = questions(&[question], FixedOffset::east_opt(2 * 3600).unwrap());
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("2024-03-02 00:15"));
        assert!(html.contains("/answer_question/q1"));
        assert!(html.contains("/questions/q1"));
    }
}
