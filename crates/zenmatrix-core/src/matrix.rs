use tracing::warn;

use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    UrgentImportant,
    NotUrgentImportant,
    UrgentNotImportant,
    NotUrgentNotImportant,
}

impl Quadrant {
    pub const ALL: [Self; 4] = [
        Self::UrgentImportant,
        Self::NotUrgentImportant,
        Self::UrgentNotImportant,
        Self::NotUrgentNotImportant,
    ];

    /// The wire label this quadrant matches on.
    pub fn label(self) -> &'static str {
        match self {
            Self::UrgentImportant => "Urgente-Importante",
            Self::NotUrgentImportant => "No Urgente-Importante",
            Self::UrgentNotImportant => "Urgente-No Importante",
            Self::NotUrgentNotImportant => "No Urgente-No Importante",
        }
    }

    /// Display heading with the classic Eisenhower action verb.
    pub fn heading(self) -> &'static str {
        match self {
            Self::UrgentImportant => "Urgente-Importante (Do)",
            Self::NotUrgentImportant => "No Urgente-Importante (Plan)",
            Self::UrgentNotImportant => "Urgente-No Importante (Delegate)",
            Self::NotUrgentNotImportant => "No Urgente-No Importante (Drop)",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|quadrant| quadrant.label() == label)
    }
}

#[derive(Debug)]
pub struct QuadrantBuckets {
    buckets: [Vec<Task>; 4],
}

impl QuadrantBuckets {
    pub fn tasks(&self, quadrant: Quadrant) -> &[Task] {
        &self.buckets[quadrant as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Quadrant, &[Task])> {
        Quadrant::ALL
            .into_iter()
            .map(|quadrant| (quadrant, self.tasks(quadrant)))
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }
}

/// Partition tasks into the four quadrants, keeping input order within
/// each bucket. A task carrying an unrecognized priority is logged and
/// filed under `No Urgente-No Importante` rather than rejected, matching
/// the server's lenient treatment of the field.
pub fn categorize(tasks: &[Task]) -> QuadrantBuckets {
    let mut buckets: [Vec<Task>; 4] = std::array::from_fn(|_| Vec::new());

    for task in tasks {
        let quadrant = match Quadrant::from_label(&task.prioridad) {
            Some(quadrant) => quadrant,
            None => {
                warn!(
                    prioridad = %task.prioridad,
                    titulo = %task.titulo,
                    "unrecognized priority, defaulting to No Urgente-No Importante"
                );
                Quadrant::NotUrgentNotImportant
            }
        };
        buckets[quadrant as usize].push(task.clone());
    }

    QuadrantBuckets { buckets }
}
