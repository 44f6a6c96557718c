// src/backend/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppError,
    models::{
        attempt::{AnswerRecord, Attempt, NewAttempt},
        question::{AnswerOption, NewQuestion, Question, QuestionRow},
        subject::{Subject, SubjectSummary},
    },
};

use super::ExamBackend;

/// Helper struct for fetching options together with their owner.
#[derive(sqlx::FromRow)]
struct OptionRow {
    id: i64,
    question_id: i64,
    option: String,
}

/// PostgreSQL-backed storage.
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExamBackend for PgBackend {
    async fn list_subjects(&self) -> Result<Vec<SubjectSummary>, AppError> {
        let subjects = sqlx::query_as::<_, SubjectSummary>(
            r#"
            SELECT
                s.id,
                s.name,
                s.slug,
                COUNT(q.id) AS question_count
            FROM subjects s
            LEFT JOIN questions q ON q.subject_id = s.id
            GROUP BY s.id, s.name, s.slug
            ORDER BY s.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list subjects: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(subjects)
    }

    async fn find_subject(&self, id: i64) -> Result<Option<Subject>, AppError> {
        let subject = sqlx::query_as::<_, Subject>("SELECT id, name, slug FROM subjects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(subject)
    }

    async fn find_subject_by_slug(&self, slug: &str) -> Result<Option<Subject>, AppError> {
        let subject =
            sqlx::query_as::<_, Subject>("SELECT id, name, slug FROM subjects WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;

        Ok(subject)
    }

    async fn create_subject(&self, name: &str, slug: &str) -> Result<Subject, AppError> {
        sqlx::query_as::<_, Subject>(
            r#"
            INSERT INTO subjects (name, slug)
            VALUES ($1, $2)
            RETURNING id, name, slug
            "#,
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Postgres error code for unique violation is 23505
            if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
                AppError::Conflict(format!("Subject '{}' already exists", slug))
            } else {
                tracing::error!("Failed to create subject: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn load_questions(&self, subject_id: i64) -> Result<Vec<Question>, AppError> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT
                id,
                question,
                comprehension,
                image_url,
                correct_option_id
            FROM questions
            WHERE subject_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch questions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let option_rows = sqlx::query_as::<_, OptionRow>(
            "SELECT id, question_id, option FROM options WHERE question_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch options: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        let mut options_by_question: HashMap<i64, Vec<_>> = HashMap::new();
        for row in option_rows {
            options_by_question
                .entry(row.question_id)
                .or_default()
                .push(AnswerOption {
                    id: row.id,
                    option: row.option,
                });
        }

        let questions = rows
            .into_iter()
            .map(|row| Question {
                options: options_by_question.remove(&row.id).unwrap_or_default(),
                id: row.id,
                number: 0,
                question: row.question,
                comprehension: row.comprehension,
                image_url: row.image_url,
                correct_option_id: row.correct_option_id,
            })
            .collect();

        Ok(questions)
    }

    async fn insert_question(&self, subject_id: i64, question: &NewQuestion) -> Result<i64, AppError> {
        let mut tx = self.pool.begin().await?;

        let question_id: i64 = sqlx::query_scalar(
            "INSERT INTO questions (subject_id, question) VALUES ($1, $2) RETURNING id",
        )
        .bind(subject_id)
        .bind(&question.question)
        .fetch_one(&mut *tx)
        .await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO options (question_id, option) ");
        builder.push_values(&question.options, |mut row, opt| {
            row.push_bind(question_id).push_bind(opt.as_str());
        });
        builder.push(" RETURNING id");

        // Postgres returns rows of a multi-row VALUES insert in input order.
        let option_ids: Vec<i64> = builder
            .build_query_scalar::<i64>()
            .fetch_all(&mut *tx)
            .await?;

        let correct_id = option_ids.get(question.correct_index).copied().ok_or_else(|| {
            AppError::BadRequest(format!(
                "correctIndex {} is out of bounds",
                question.correct_index
            ))
        })?;

        sqlx::query("UPDATE questions SET correct_option_id = $1 WHERE id = $2")
            .bind(correct_id)
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(question_id)
    }

    async fn insert_attempt(&self, attempt: &NewAttempt) -> Result<Attempt, AppError> {
        sqlx::query_as::<_, Attempt>(
            r#"
            INSERT INTO attempts
            (user_id, subject, correct, wrong, not_attended, total_questions)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, subject, correct, wrong, not_attended, total_questions, created_at
            "#,
        )
        .bind(&attempt.user_id)
        .bind(&attempt.subject)
        .bind(attempt.correct)
        .bind(attempt.wrong)
        .bind(attempt.not_attended)
        .bind(attempt.total_questions)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert attempt: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })
    }

    async fn insert_answers(&self, records: &[AnswerRecord]) -> Result<(), AppError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO user_answers (attempt_id, question_id, selected_option_id) ",
        );
        builder.push_values(records, |mut row, record| {
            row.push_bind(record.attempt_id)
                .push_bind(record.question_id)
                .push_bind(record.selected_option_id);
        });

        builder.build().execute(&self.pool).await?;

        Ok(())
    }

    async fn find_attempt(&self, id: i64) -> Result<Option<Attempt>, AppError> {
        let attempt = sqlx::query_as::<_, Attempt>(
            r#"
            SELECT id, user_id, subject, correct, wrong, not_attended, total_questions, created_at
            FROM attempts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempt)
    }

    async fn answers_for_attempt(&self, attempt_id: i64) -> Result<Vec<AnswerRecord>, AppError> {
        let records = sqlx::query_as::<_, AnswerRecord>(
            r#"
            SELECT attempt_id, question_id, selected_option_id
            FROM user_answers
            WHERE attempt_id = $1
            ORDER BY id
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
