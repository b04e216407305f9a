use crate::auth::validate;
use crate::errors::{AppError, FieldError};
use crate::models::project::Achievement;
use crate::models::submission::Answer;

/// Decoded answers of the first application form. Answers are read by
/// position after sorting on question id.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationSchemaV1 {
    pub student1_name: String,
    pub student2_name: String,
    pub student1_email: String,
    pub student2_email: String,
    pub student1_matric: String,
    pub student2_matric: String,
    pub student1_nusnet: String,
    pub student2_nusnet: String,
    pub team_name: String,
    pub achievement: Achievement,
}

impl ApplicationSchemaV1 {
    pub const VERSION: i32 = 1;
    pub const ANSWER_COUNT: usize = 10;

    /// Decode and validate. Extra answers beyond the first ten are ignored.
    pub fn decode(answers: &[Answer]) -> Result<Self, AppError> {
        if answers.len() < Self::ANSWER_COUNT {
            return Err(AppError::BadRequest(format!(
                "An application needs at least {} answers, got {}",
                Self::ANSWER_COUNT,
                answers.len()
            )));
        }
        let mut sorted: Vec<&Answer> = answers.iter().collect();
        sorted.sort_by_key(|a| a.question_id);
        let v: Vec<String> = sorted
            .iter()
            .take(Self::ANSWER_COUNT)
            .map(|a| a.answer.trim().to_string())
            .collect();

        let achievement = v[9].parse::<Achievement>().map_err(|e| {
            AppError::Validation(vec![FieldError::new("achievement", e)])
        })?;
        let decoded = ApplicationSchemaV1 {
            student1_name: v[0].clone(),
            student2_name: v[1].clone(),
            student1_email: v[2].clone(),
            student2_email: v[3].clone(),
            student1_matric: v[4].clone(),
            student2_matric: v[5].clone(),
            student1_nusnet: v[6].clone(),
            student2_nusnet: v[7].clone(),
            team_name: v[8].clone(),
            achievement,
        };
        decoded.validate()?;
        Ok(decoded)
    }

    fn validate(&self) -> Result<(), AppError> {
        let errors = [
            validate::validate_required("student1Name", &self.student1_name, 200),
            validate::validate_required("student2Name", &self.student2_name, 200),
            validate::validate_email("student1Email", &self.student1_email),
            validate::validate_email("student2Email", &self.student2_email),
            validate::validate_matriculation_no("student1Matric", &self.student1_matric),
            validate::validate_matriculation_no("student2Matric", &self.student2_matric),
            validate::validate_nusnet_id("student1Nusnet", &self.student1_nusnet),
            validate::validate_nusnet_id("student2Nusnet", &self.student2_nusnet),
            validate::validate_required("teamName", &self.team_name, 200),
        ]
        .into_iter()
        .flatten()
        .collect();
        validate::finish(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(values: [&str; 10]) -> Vec<Answer> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Answer { question_id: 100 + i as i64, answer: v.to_string() })
            .collect()
    }

    const VALID: [&str; 10] = [
        "Ann Tan",
        "Ben Lim",
        "ann@u.nus.edu",
        "ben@u.nus.edu",
        "A0000001X",
        "A0000002Y",
        "E0000001",
        "E0000002",
        "Rocket",
        "Gemini",
    ];

    #[test]
    fn decodes_by_question_order() {
        let mut shuffled = answers(VALID);
        shuffled.reverse();
        let decoded = ApplicationSchemaV1::decode(&shuffled).unwrap();
        assert_eq!(decoded.student1_name, "Ann Tan");
        assert_eq!(decoded.student2_email, "ben@u.nus.edu");
        assert_eq!(decoded.team_name, "Rocket");
        assert_eq!(decoded.achievement, Achievement::Gemini);
    }

    #[test]
    fn too_few_answers() {
        let mut short = answers(VALID);
        short.pop();
        assert!(matches!(ApplicationSchemaV1::decode(&short), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn reports_every_bad_identifier() {
        let mut values = VALID;
        values[3] = "not-an-email";
        values[4] = "A123";
        values[7] = "X0000002";
        match ApplicationSchemaV1::decode(&answers(values)) {
            Err(AppError::Validation(fields)) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["student2Email", "student1Matric", "student2Nusnet"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_achievement() {
        let mut values = VALID;
        values[9] = "Mercury";
        assert!(matches!(ApplicationSchemaV1::decode(&answers(values)), Err(AppError::Validation(_))));
    }
}
