// src/exam/repository.rs

use crate::{
    backend::ExamBackend,
    error::AppError,
    models::{question::Question, subject::Subject},
};

/// Loads the question set of a subject for an exam.
///
/// Numbers are assigned 1..=n in backend order. Every failure is a fetch
/// error surfaced to the candidate as-is; there is no retry.
pub async fn load_question_set(
    backend: &dyn ExamBackend,
    subject_slug: &str,
) -> Result<(Subject, Vec<Question>), AppError> {
    let slug = subject_slug.trim().to_lowercase();

    let subject = backend
        .find_subject_by_slug(&slug)
        .await
        .map_err(|e| {
            tracing::error!("Failed to look up subject {}: {}", slug, e);
            AppError::InternalServerError("Failed to load questions".to_string())
        })?
        .ok_or_else(|| AppError::NotFound("Invalid test selected".to_string()))?;

    let mut questions = backend.load_questions(subject.id).await.map_err(|e| {
        tracing::error!("Failed to load questions for {}: {}", slug, e);
        AppError::InternalServerError("Failed to load questions".to_string())
    })?;

    if questions.is_empty() {
        return Err(AppError::NotFound(
            "No questions available for this subject".to_string(),
        ));
    }

    for (index, question) in questions.iter_mut().enumerate() {
        question.number = index + 1;
    }

    Ok((subject, questions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::MemoryBackend, models::question::NewQuestion};

    fn new_question(text: &str) -> NewQuestion {
        NewQuestion {
            question: text.to_string(),
            options: vec!["a".to_string(), "b".to_string()],
            correct_index: 1,
        }
    }

    #[tokio::test]
    async fn numbers_questions_in_order() {
        let backend = MemoryBackend::new();
        let subject = backend.create_subject("Math", "math").await.unwrap();
        backend.insert_question(subject.id, &new_question("first")).await.unwrap();
        backend.insert_question(subject.id, &new_question("second")).await.unwrap();

        let (loaded, questions) = load_question_set(&backend, "MATH").await.unwrap();
        assert_eq!(loaded.id, subject.id);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].number, 1);
        assert_eq!(questions[1].question, "second");
        assert_eq!(questions[1].number, 2);
        assert_eq!(questions[1].correct_option_id, Some(questions[1].options[1].id));
    }

    #[tokio::test]
    async fn unknown_subject_is_invalid_test() {
        let backend = MemoryBackend::new();
        let err = load_question_set(&backend, "nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Invalid test selected"));
    }

    #[tokio::test]
    async fn empty_subject_has_no_questions() {
        let backend = MemoryBackend::new();
        backend.create_subject("Empty", "empty").await.unwrap();
        let err = load_question_set(&backend, "empty").await.unwrap_err();
        assert!(
            matches!(err, AppError::NotFound(msg) if msg == "No questions available for this subject")
        );
    }
}
