use anyhow::Result;
use async_trait::async_trait;
use shared::domain::{Question, QuestionId, QuestionKind};
use storage::Storage;

/// Read-only source of quiz questions.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    async fn question_by_id(&self, question_id: QuestionId) -> Result<Option<Question>>;
    async fn questions_by_type(&self, kind: QuestionKind) -> Result<Vec<Question>>;
}

#[async_trait]
impl QuestionBank for Storage {
    async fn question_by_id(&self, question_id: QuestionId) -> Result<Option<Question>> {
        Storage::question_by_id(self, question_id).await
    }

    async fn questions_by_type(&self, kind: QuestionKind) -> Result<Vec<Question>> {
        Storage::questions_by_type(self, kind).await
    }
}

/// In-process catalogue used when no database is configured.
#[derive(Debug, Clone)]
pub struct BuiltinQuestions {
    questions: Vec<Question>,
}

impl BuiltinQuestions {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl Default for BuiltinQuestions {
    fn default() -> Self {
        use QuestionKind::{CiertoFalso, OpcionMultiple};

        let true_false = || vec!["Cierto".to_string(), "Falso".to_string()];
        let entries: Vec<(i64, QuestionKind, &str, Vec<String>, &str, &str, i64)> = vec![
            (1, CiertoFalso, "¿La capital de Francia es París?", true_false(), "Cierto", "Geografía", 1),
            (2, CiertoFalso, "¿Los pingüinos pueden volar?", true_false(), "Falso", "Naturaleza", 1),
            (
                3,
                OpcionMultiple,
                "¿Cuál es el planeta más grande del sistema solar?",
                strings(&["Marte", "Júpiter", "Saturno", "Neptuno"]),
                "Júpiter",
                "Astronomía",
                2,
            ),
            (
                4,
                OpcionMultiple,
                "¿En qué año comenzó la Primera Guerra Mundial?",
                strings(&["1912", "1914", "1916", "1918"]),
                "1914",
                "Historia",
                2,
            ),
            (
                5,
                CiertoFalso,
                "¿El agua hierve a 100 grados Celsius al nivel del mar?",
                true_false(),
                "Cierto",
                "Ciencia",
                1,
            ),
            (
                6,
                OpcionMultiple,
                "¿Cuál es el océano más grande del mundo?",
                strings(&["Atlántico", "Índico", "Pacífico", "Ártico"]),
                "Pacífico",
                "Geografía",
                2,
            ),
            (7, CiertoFalso, "¿Shakespeare escribió 'Romeo y Julieta'?", true_false(), "Cierto", "Literatura", 1),
            (
                8,
                OpcionMultiple,
                "¿Cuál es la moneda de Japón?",
                strings(&["Won", "Yuan", "Yen", "Dong"]),
                "Yen",
                "Geografía",
                2,
            ),
        ];

        Self::new(
            entries
                .into_iter()
                .map(
                    |(id, kind, question, options, correct_answer, category, difficulty)| Question {
                        id: QuestionId(id),
                        kind,
                        question: question.to_string(),
                        options,
                        correct_answer: correct_answer.to_string(),
                        category: category.to_string(),
                        difficulty,
                    },
                )
                .collect(),
        )
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[async_trait]
impl QuestionBank for BuiltinQuestions {
    async fn question_by_id(&self, question_id: QuestionId) -> Result<Option<Question>> {
        Ok(self.questions.iter().find(|q| q.id == question_id).cloned())
    }

    async fn questions_by_type(&self, kind: QuestionKind) -> Result<Vec<Question>> {
        Ok(self
            .questions
            .iter()
            .filter(|q| q.kind == kind)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builtin_catalogue_matches_seeded_database() {
        let builtin = BuiltinQuestions::default();
        let storage = Storage::new("sqlite::memory:").await.expect("db");

        for kind in [QuestionKind::CiertoFalso, QuestionKind::OpcionMultiple] {
            let from_memory = builtin.questions_by_type(kind).await.expect("builtin");
            let from_db = QuestionBank::questions_by_type(&storage, kind)
                .await
                .expect("storage");
            assert_eq!(from_memory, from_db);
        }
        assert_eq!(builtin.len(), 8);
    }

    #[tokio::test]
    async fn builtin_lookup_by_id() {
        let builtin = BuiltinQuestions::default();
        let question = builtin
            .question_by_id(QuestionId(3))
            .await
            .expect("lookup")
            .expect("question 3");
        assert_eq!(question.correct_answer, "Júpiter");
        assert!(builtin
            .question_by_id(QuestionId(42))
            .await
            .expect("lookup")
            .is_none());
    }
}
