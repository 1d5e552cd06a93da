use clap::{Args, Subcommand};
use eyre::Context;
use mini_orm::{
    Entity, EntityManager,
    chrono::{Local, NaiveDateTime, Timelike},
    entity::column::DATE_TIME_FORMAT,
};
use tracing::info;

#[derive(Entity, Debug, Default)]
#[entity(table = "Users")]
pub struct User {
    #[entity(id)]
    pub id: i64,
    #[entity(column)]
    pub username: String,
    #[entity(column)]
    pub password: String,
    #[entity(column)]
    pub age: i32,
    #[entity(column)]
    pub registration_date: NaiveDateTime,
}

impl User {
    fn log(&self) {
        info!(
            id = self.id,
            username = %self.username,
            age = self.age,
            registered = %self.registration_date,
            "user"
        );
    }
}

fn parse_date_time(input: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(input, DATE_TIME_FORMAT)
        .map_err(|e| format!("expected `yyyy-mm-dd HH:MM:SS`: {e}"))
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Insert a new user
    Add(AddUser),
    /// Load a user by identity
    Get {
        id: i64,
    },
    /// Load every user, optionally narrowed down by a raw SQL filter
    List(FilterUsers),
    /// Load the first user, optionally narrowed down by a raw SQL filter
    First(FilterUsers),
    /// Change the age of an existing user
    SetAge {
        id: i64,
        age: i32,
    },
}

#[derive(Args, Debug)]
pub struct AddUser {
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    age: i32,
    /// Registration date, `yyyy-mm-dd HH:MM:SS`. Defaults to now.
    #[arg(long, value_parser = parse_date_time)]
    registered: Option<NaiveDateTime>,
}

#[derive(Args, Debug)]
pub struct FilterUsers {
    /// Raw SQL appended to the query, e.g. `WHERE "Age" > 18`
    #[arg(short, long)]
    filter: Option<String>,
}

impl UserCommand {
    pub async fn run(self, manager: &EntityManager) -> eyre::Result<()> {
        match self {
            Self::Add(args) => {
                let registration_date = match args.registered {
                    Some(date) => date,
                    None => Local::now()
                        .naive_local()
                        .with_nanosecond(0)
                        .unwrap_or_default(),
                };

                let mut user = User {
                    id: 0,
                    username: args.username,
                    password: args.password,
                    age: args.age,
                    registration_date,
                };

                if manager
                    .persist(&mut user)
                    .await
                    .context("Failed to insert user")?
                {
                    user.log();
                } else {
                    return Err(eyre::eyre!("User was not stored"));
                }
            }
            Self::Get { id } => {
                manager
                    .find_by_id::<User>(id)
                    .await
                    .context("Failed to load user")?
                    .log();
            }
            Self::List(args) => {
                let users = match args.filter {
                    Some(filter) => manager.find_all_where::<User>(&filter).await,
                    None => manager.find_all::<User>().await,
                }
                .context("Failed to load users")?;

                info!("{} user(s) found", users.len());
                users.iter().for_each(User::log);
            }
            Self::First(args) => {
                let user = match args.filter {
                    Some(filter) => manager.find_first_where::<User>(&filter).await,
                    None => manager.find_first::<User>().await,
                }
                .context("Failed to load user")?;

                user.log();
            }
            Self::SetAge { id, age } => {
                let mut user = manager
                    .find_by_id::<User>(id)
                    .await
                    .context("Failed to load user")?;

                user.age = age;

                if manager
                    .persist(&mut user)
                    .await
                    .context("Failed to update user")?
                {
                    user.log();
                } else {
                    return Err(eyre::eyre!("User {id} was not updated"));
                }
            }
        }

        Ok(())
    }
}
