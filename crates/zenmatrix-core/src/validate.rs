use crate::task::Task;

const MIN_TEXT_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Pre-submission checks, mirrored from the required-field rules the task
/// form enforces: title, project and responsible need at least three
/// characters, priority must be chosen. Date fields are typed by the time
/// they reach a `Task`, so parseability is already settled.
///
/// All violations are collected so every offending field can be reported
/// at once.
pub fn validate_task(task: &Task) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    check_min_len(&mut errors, "titulo", &task.titulo);
    check_min_len(&mut errors, "proyecto", &task.proyecto);
    check_min_len(&mut errors, "responsable", &task.responsable);

    if task.prioridad.trim().is_empty() {
        errors.push(FieldError {
            field: "prioridad",
            message: "a priority is required".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn check_min_len(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    let len = value.trim().chars().count();
    if len == 0 {
        errors.push(FieldError {
            field,
            message: "is required".to_string(),
        });
    } else if len < MIN_TEXT_LEN {
        errors.push(FieldError {
            field,
            message: format!("must be at least {MIN_TEXT_LEN} characters"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::validate_task;
    use crate::task::Task;

    fn valid_task() -> Task {
        let mut task = Task::new_draft("Pay rent".to_string());
        task.proyecto = "Home".to_string();
        task.responsable = "Ana".to_string();
        task.prioridad = "Urgente-Importante".to_string();
        task
    }

    #[test]
    fn a_complete_draft_passes() {
        assert!(validate_task(&valid_task()).is_ok());
    }

    #[test]
    fn two_character_title_is_rejected_three_accepted() {
        let mut task = valid_task();
        task.titulo = "ab".to_string();
        let errors = validate_task(&task).expect_err("too short");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "titulo");

        task.titulo = "abc".to_string();
        assert!(validate_task(&task).is_ok());
    }

    #[test]
    fn empty_priority_is_rejected() {
        let mut task = valid_task();
        task.prioridad = "  ".to_string();
        let errors = validate_task(&task).expect_err("blank priority");
        assert_eq!(errors[0].field, "prioridad");
    }

    #[test]
    fn every_broken_field_is_reported() {
        let task = Task::new_draft(String::new());
        let errors = validate_task(&task).expect_err("empty draft");
        let fields: Vec<&str> = errors.iter().map(|error| error.field).collect();
        assert_eq!(fields, vec!["titulo", "proyecto", "responsable", "prioridad"]);
    }
}
