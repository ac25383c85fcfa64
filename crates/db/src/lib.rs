pub mod error;

use core::str::FromStr;
use futures_util::{future, TryStreamExt};
use model::{DateTime, Question, Utc};
use uuid::Uuid;

pub use tokio_postgres::{tls::NoTls, Client, Config};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS questions (\
    id TEXT PRIMARY KEY, \
    content TEXT NOT NULL CONSTRAINT questions_content_check CHECK (content <> ''), \
    answer TEXT, \
    timestamp TIMESTAMPTZ NOT NULL DEFAULT now()\
)";

/// Connection parameters for the question table. No connection is held between operations:
/// every unit of work goes through its own [`Session`].
pub struct Store(Config);

impl From<Config> for Store {
    fn from(config: Config) -> Self {
        Self(config)
    }
}

impl FromStr for Store {
    type Err = tokio_postgres::Error;
    fn from_str(url: &str) -> Result<Self, Self::Err> {
        url.parse().map(Self)
    }
}

impl Store {
    /// Opens a connection for the duration of one operation. The connection is driven in the
    /// background and closes as soon as the returned [`Session`] is dropped.
    pub async fn session(&self) -> error::Result<Session> {
        let (client, conn) = self.0.connect(NoTls).await?;
        tokio::spawn(async move {
            if let Err(err) = conn.await {
                log::error!("database connection closed abruptly: {err}");
            }
        });
        Ok(Session(client))
    }
}

/// A scoped handle to the database.
pub struct Session(Client);

fn deserialize_question_from_row(row: tokio_postgres::Row) -> error::Result<Question> {
    let id: String = row.try_get("id")?;
    let content: String = row.try_get("content")?;
    let answer: Option<String> = row.try_get("answer")?;
    let timestamp: DateTime<Utc> = row.try_get("timestamp")?;
    Ok(Question {
        id: id.into_boxed_str(),
        content: content.into_boxed_str(),
        answer: answer.map(String::into_boxed_str),
        timestamp,
    })
}

impl Session {
    pub async fn init_schema(&self) -> error::Result<()> {
        self.0.batch_execute(SCHEMA).await?;
        Ok(())
    }

    pub async fn create(&self, content: &str) -> error::Result<Question> {
        let id = Uuid::new_v4().to_string();
        let row = self
            .0
            .query_one(
                "INSERT INTO questions (id, content) VALUES ($1, $2) RETURNING id, content, answer, timestamp",
                &[&id, &content],
            )
            .await?;
        deserialize_question_from_row(row)
    }

    async fn collect(&self, query: &str) -> error::Result<Vec<Question>> {
        self.0
            .query_raw(query, core::iter::empty::<&str>())
            .await?
            .map_err(error::Error::from)
            .and_then(|row| future::ready(deserialize_question_from_row(row)))
            .try_collect()
            .await
    }

    pub async fn list_all(&self, order_by_timestamp_desc: bool) -> error::Result<Vec<Question>> {
        self.collect(if order_by_timestamp_desc {
            "SELECT id, content, answer, timestamp FROM questions ORDER BY timestamp DESC"
        } else {
            "SELECT id, content, answer, timestamp FROM questions"
        })
        .await
    }

    pub async fn list_answered(&self) -> error::Result<Vec<Question>> {
        self.collect("SELECT id, content, answer, timestamp FROM questions WHERE answer IS NOT NULL").await
    }

    pub async fn get(&self, id: &str) -> error::Result<Option<Question>> {
        self.0
            .query_opt("SELECT id, content, answer, timestamp FROM questions WHERE id = $1", &[&id])
            .await?
            .map(deserialize_question_from_row)
            .transpose()
    }

    /// Overwrites the answer of an existing question. Last write wins.
    pub async fn set_answer(&self, id: &str, answer: &str) -> error::Result<()> {
        match self.0.execute("UPDATE questions SET answer = $2 WHERE id = $1", &[&id, &answer]).await? {
            0 => Err(error::Error::NotFound),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{error::Error, Store};
    use core::time::Duration;

    #[tokio::test(flavor = "current_thread")]
    async fn database_test() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping database test");
            return;
        };
        let store: Store = url.parse().expect("invalid connection string");
        let db = store.session().await.expect("cannot connect to database");
        db.init_schema().await.unwrap();

        // Question creation
        let first = db.create("What is the answer?").await.unwrap();
        assert_eq!(first.content.as_ref(), "What is the answer?");
        assert!(first.answer.is_none());
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = db.create("Why is the sky blue?").await.unwrap();
        assert_ne!(first.id, second.id);

        // Empty questions are rejected by the table constraint
        assert_eq!(db.create("").await.unwrap_err(), Error::BadInput);

        // Newest first
        let all = db.list_all(true).await.unwrap();
        let first_pos = all.iter().position(|q| q.id == first.id).unwrap();
        let second_pos = all.iter().position(|q| q.id == second.id).unwrap();
        assert!(second_pos < first_pos);
        assert_eq!(all.iter().filter(|q| q.content.as_ref() == "Why is the sky blue?" && q.id == second.id).count(), 1);

        // Unanswered questions are excluded from the answered listing
        let answered = db.list_answered().await.unwrap();
        assert!(answered.iter().all(|q| q.answer.is_some()));
        assert!(!answered.iter().any(|q| q.id == first.id));

        // Answers may be overwritten
        db.set_answer(&first.id, "42").await.unwrap();
        assert_eq!(db.get(&first.id).await.unwrap().unwrap().answer.as_deref(), Some("42"));
        db.set_answer(&first.id, "43").await.unwrap();
        let fetched = db.get(&first.id).await.unwrap().unwrap();
        assert_eq!(fetched.answer.as_deref(), Some("43"));
        assert_eq!(fetched.content, first.content);
        assert!(db.list_answered().await.unwrap().iter().any(|q| q.id == first.id));

        // Missing records
        assert!(db.get("does-not-exist").await.unwrap().is_none());
        assert_eq!(db.set_answer("does-not-exist", "42").await.unwrap_err(), Error::NotFound);
    }
}
