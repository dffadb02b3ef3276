use askama::Template;
use domains::QuestionView;

/// One line of the public question list.
pub struct QuestionRow {
    pub title: String,
    pub author: String,
    pub asked: String,
    pub score: i64,
    pub answers: i64,
    pub solved: bool,
}

impl From<&QuestionView> for QuestionRow {
    fn from(view: &QuestionView) -> Self {
        Self {
            title: view.question.title.clone(),
            author: view.author_username.clone(),
            asked: view.question.created_at.format("%Y-%m-%d %H:%M").to_string(),
            score: view.score,
            answers: view.answer_count,
            solved: view.has_correct_answer,
        }
    }
}

#[derive(Template)]
#[template(
    ext = "html",
    source = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{{ title }}</title>
</head>
<body>
  <h1>{{ title }}</h1>
  {% if questions.is_empty() %}
  <p>No questions yet.</p>
  {% else %}
  <table>
    <thead>
      <tr><th>Question</th><th>Asked by</th><th>When</th><th>Score</th><th>Answers</th></tr>
    </thead>
    <tbody>
    {% for q in questions %}
      <tr>
        <td>{% if q.solved %}&#10003; {% endif %}{{ q.title }}</td>
        <td>{{ q.author }}</td>
        <td>{{ q.asked }}</td>
        <td>{{ q.score }}</td>
        <td>{{ q.answers }}</td>
      </tr>
    {% endfor %}
    </tbody>
  </table>
  {% endif %}
</body>
</html>
"#
)]
pub struct IndexTemplate<'a> {
    pub title: &'a str,
    pub questions: &'a [QuestionRow],
}

#[cfg(test)]
mod tests {
    use domains::Question;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn index_escapes_question_titles() {
        let view = QuestionView {
            question: Question::new(Uuid::now_v7(), "<script>x</script>".into(), "body".into()),
            author_username: "alice".into(),
            score: 2,
            answer_count: 1,
            has_correct_answer: true,
        };
        let rows = [QuestionRow::from(&view)];

        let html = IndexTemplate { title: "Classboard", questions: &rows }.render().unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("alice"));
    }

    #[test]
    fn empty_board_says_so() {
        let html = IndexTemplate { title: "Classboard", questions: &[] }.render().unwrap();
        assert!(html.contains("No questions yet."));
    }
}
