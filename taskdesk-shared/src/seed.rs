/// Demo account and sample tasks
///
/// Used by the `taskdesk-seed` binary, by the API's in-memory mode and by the
/// integration tests, so every environment offers the same login.

use serde::Serialize;
use tracing::info;

use crate::auth::password::{hash_password, PasswordError};
use crate::models::priority::Priority;
use crate::models::task::{CreateTask, UpdateTask};
use crate::models::user::{CreateUser, User};
use crate::store::{Store, StoreError};

pub const DEMO_EMAIL: &str = "demo@taskmanager.com";
pub const DEMO_PASSWORD: &str = "demo123";
pub const DEMO_NAME: &str = "Demo User";

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// A sample task in the demo data set
#[derive(Debug, Clone, Copy)]
pub struct SeedTask {
    pub title: &'static str,
    pub description: &'static str,
    pub priority: Priority,
    pub completed: bool,
}

pub const DEMO_TASKS: [SeedTask; 5] = [
    SeedTask {
        title: "Configurar PostgreSQL",
        description: "Conectar backend con base de datos real",
        priority: Priority::High,
        completed: true,
    },
    SeedTask {
        title: "Implementar Prisma ORM",
        description: "Crear modelos y migraciones",
        priority: Priority::High,
        completed: true,
    },
    SeedTask {
        title: "Implementar autenticación JWT",
        description: "Sistema de login para usuarios",
        priority: Priority::Urgent,
        completed: false,
    },
    SeedTask {
        title: "Testear endpoints con base de datos",
        description: "Verificar que todo funcione correctamente",
        priority: Priority::Medium,
        completed: false,
    },
    SeedTask {
        title: "Documentar decisiones técnicas",
        description: "Actualizar README con nueva arquitectura",
        priority: Priority::Low,
        completed: false,
    },
];

/// What [`seed_demo_data`] did
#[derive(Debug, Clone, Serialize)]
pub struct SeedSummary {
    pub user: User,
    pub user_created: bool,
    pub tasks_created: usize,
}

/// Creates the demo user with its sample tasks
///
/// Idempotent: when the demo user already exists nothing is written. With
/// `reset`, the existing demo user (and by cascade its tasks) is removed first.
pub async fn seed_demo_data(store: &dyn Store, reset: bool) -> Result<SeedSummary, SeedError> {
    if let Some(existing) = store.find_user_by_email(DEMO_EMAIL).await? {
        if !reset {
            info!(email = DEMO_EMAIL, "Demo user already present, skipping seed");
            return Ok(SeedSummary {
                user: existing,
                user_created: false,
                tasks_created: 0,
            });
        }
        store.delete_user(existing.id).await?;
        info!(email = DEMO_EMAIL, "Removed existing demo user");
    }

    let user = store
        .create_user(CreateUser {
            email: DEMO_EMAIL.to_string(),
            password_hash: hash_password(DEMO_PASSWORD)?,
            name: Some(DEMO_NAME.to_string()),
        })
        .await?;

    for seed in DEMO_TASKS {
        let task = store
            .create_task(CreateTask {
                user_id: user.id,
                title: seed.title.to_string(),
                description: Some(seed.description.to_string()),
                priority: seed.priority,
                due_date: None,
            })
            .await?;

        if seed.completed {
            store
                .update_task(
                    task.id,
                    UpdateTask {
                        completed: Some(true),
                        ..Default::default()
                    },
                )
                .await?;
        }
        info!(title = seed.title, "Seeded task");
    }

    Ok(SeedSummary {
        user,
        user_created: true,
        tasks_created: DEMO_TASKS.len(),
    })
}
