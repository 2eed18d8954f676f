//! Chat-side glue: turns incoming activities into course queries and course
//! records into replies. Nothing here knows about a particular chat SDK; the
//! host passes an [`Activity`] in and delivers the returned [`Reply`] values.

use crate::error::cinwiki::QueryError;
use crate::model::activity::{
    Activity, CardAction, CardImage, ChannelAccount, Reply, ThumbnailCard,
};
use crate::model::course::{CourseQuery, CourseRecord};
use crate::wire::client::CourseLookup;

pub const WELCOME_TEXT: &str = "Sou o CInWiki-BOT e vou te ajudar a obter mais informações \
     sobre algumas cadeiras do CIn. Digite o código de alguma cadeira para começarmos!";
pub const CARD_IMAGE_URL: &str =
    "https://www2.cin.ufpe.br/site/uploads/arquivos/18/20120530161145_marca_cin_2012_producao.jpg";
pub const CARD_BUTTON_TITLE: &str = "Página da CInWiki";

pub fn not_found_text(query: &CourseQuery) -> String {
    format!("Não encontrei a cadeira {} na CInWiki.", query)
}

pub fn invalid_code_text(err: &QueryError) -> String {
    match err {
        QueryError::Empty => "Digite o código de uma cadeira, por exemplo IF684.".to_string(),
        QueryError::InvalidCode(code) => format!(
            "\"{}\" não parece um código de cadeira. Tente algo como IF684.",
            code
        ),
    }
}

pub fn unavailable_text() -> String {
    "O serviço de consulta está indisponível no momento. Tente novamente mais tarde.".to_string()
}

/// The query a message asks for.
pub fn query_from_message(text: &str) -> Result<CourseQuery, QueryError> {
    CourseQuery::parse(text)
}

/// Card showing a found course, linking to its wiki page.
pub fn course_card(record: &CourseRecord, link: &str) -> ThumbnailCard {
    ThumbnailCard {
        title: record.name.clone(),
        subtitle: record.instructor.clone(),
        text: String::new(),
        images: vec![CardImage {
            url: CARD_IMAGE_URL.to_string(),
        }],
        buttons: vec![CardAction {
            type_field: "openUrl".to_string(),
            title: CARD_BUTTON_TITLE.to_string(),
            value: link.to_string(),
        }],
    }
}

/// One greeting per added member, skipping the bot itself.
pub fn welcome_replies(members_added: &[ChannelAccount], recipient: &ChannelAccount) -> Vec<Reply> {
    members_added
        .iter()
        .filter(|member| member.id != recipient.id)
        .map(|member| Reply::Text(format!("Olá, {}! {}", member.name, WELCOME_TEXT)))
        .collect()
}

pub struct CinWikiBot<L> {
    lookup: L,
    base_url: String,
}

impl<L: CourseLookup> CinWikiBot<L> {
    pub fn new(lookup: L, base_url: impl Into<String>) -> Self {
        CinWikiBot {
            lookup,
            base_url: base_url.into(),
        }
    }

    /// Handles one turn. Failures become explanatory text, never an error.
    pub async fn on_turn(&self, activity: &Activity) -> Vec<Reply> {
        match activity {
            Activity::Message { text } => vec![self.answer(text).await],
            Activity::ConversationUpdate {
                members_added,
                recipient,
            } => welcome_replies(members_added, recipient),
            Activity::Other { kind } => vec![Reply::Text(format!("{} event detected", kind))],
        }
    }

    async fn answer(&self, text: &str) -> Reply {
        let query = match query_from_message(text) {
            Ok(query) => query,
            Err(err) => return Reply::Text(invalid_code_text(&err)),
        };

        match self.lookup.find(&query).await {
            Ok(record) if record.is_complete() => {
                Reply::Card(course_card(&record, &query.page_url(&self.base_url)))
            }
            Ok(_) => Reply::Text(not_found_text(&query)),
            Err(err) => {
                log::warn!("lookup of {} failed: {}", query, err);
                Reply::Text(unavailable_text())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::cinwiki::{ClientError, MalformedResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const BASE: &str = "https://pet.cin.ufpe.br/~pet/wiki/";

    struct FakeLookup {
        answer: fn() -> Result<CourseRecord, ClientError>,
        seen: Mutex<Vec<String>>,
    }

    impl FakeLookup {
        fn new(answer: fn() -> Result<CourseRecord, ClientError>) -> Self {
            FakeLookup {
                answer,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CourseLookup for FakeLookup {
        async fn find(&self, query: &CourseQuery) -> Result<CourseRecord, ClientError> {
            self.seen.lock().unwrap().push(query.code.clone());
            (self.answer)()
        }
    }

    fn message(text: &str) -> Activity {
        Activity::Message {
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn found_course_becomes_a_card() {
        let bot = CinWikiBot::new(
            FakeLookup::new(|| Ok(CourseRecord::new("Compiladores", "Fernando Castor"))),
            BASE,
        );
        let replies = bot.on_turn(&message(" if684 ")).await;

        assert_eq!(bot.lookup.seen.lock().unwrap().as_slice(), ["IF684"]);
        let [Reply::Card(card)] = replies.as_slice() else {
            panic!("expected one card, got {replies:?}");
        };
        assert_eq!(card.title, "Compiladores");
        assert_eq!(card.subtitle, "Fernando Castor");
        assert_eq!(card.images[0].url, CARD_IMAGE_URL);
        assert_eq!(card.buttons[0].type_field, "openUrl");
        assert_eq!(card.buttons[0].value, "https://pet.cin.ufpe.br/~pet/wiki/IF684");
    }

    #[tokio::test]
    async fn empty_record_falls_back_to_not_found_text() {
        let bot = CinWikiBot::new(FakeLookup::new(|| Ok(CourseRecord::empty())), BASE);
        let replies = bot.on_turn(&message("XX000")).await;
        assert_eq!(
            replies,
            vec![Reply::Text("Não encontrei a cadeira XX000 na CInWiki.".to_string())]
        );
    }

    #[tokio::test]
    async fn partial_record_is_not_found_too() {
        let bot = CinWikiBot::new(FakeLookup::new(|| Ok(CourseRecord::new("Redes", ""))), BASE);
        let replies = bot.on_turn(&message("IF678")).await;
        assert!(matches!(replies.as_slice(), [Reply::Text(text)] if text.contains("IF678")));
    }

    #[tokio::test]
    async fn transport_failure_reads_as_unavailable() {
        let bot = CinWikiBot::new(
            FakeLookup::new(|| Err(MalformedResponse("garbage".to_string()).into())),
            BASE,
        );
        let replies = bot.on_turn(&message("IF684")).await;
        assert_eq!(replies, vec![Reply::Text(unavailable_text())]);
    }

    #[tokio::test]
    async fn invalid_code_never_reaches_the_server() {
        let bot = CinWikiBot::new(FakeLookup::new(|| Ok(CourseRecord::empty())), BASE);
        let replies = bot.on_turn(&message("qual é a cadeira?")).await;
        assert!(bot.lookup.seen.lock().unwrap().is_empty());
        assert!(matches!(replies.as_slice(), [Reply::Text(text)] if text.contains("IF684")));
    }

    #[tokio::test]
    async fn new_members_are_greeted_but_not_the_bot() {
        let bot = CinWikiBot::new(FakeLookup::new(|| Ok(CourseRecord::empty())), BASE);
        let activity = Activity::ConversationUpdate {
            members_added: vec![
                ChannelAccount::new("bot", "CInWiki-BOT"),
                ChannelAccount::new("u1", "Maria"),
            ],
            recipient: ChannelAccount::new("bot", "CInWiki-BOT"),
        };
        let replies = bot.on_turn(&activity).await;
        assert_eq!(
            replies,
            vec![Reply::Text(format!("Olá, Maria! {}", WELCOME_TEXT))]
        );
    }

    #[tokio::test]
    async fn other_activities_are_echoed_by_kind() {
        let bot = CinWikiBot::new(FakeLookup::new(|| Ok(CourseRecord::empty())), BASE);
        let replies = bot
            .on_turn(&Activity::Other {
                kind: "typing".to_string(),
            })
            .await;
        assert_eq!(replies, vec![Reply::Text("typing event detected".to_string())]);
    }
}
