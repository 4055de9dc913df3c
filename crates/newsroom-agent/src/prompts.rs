//! Prompt text sent to the model.

/// System prompt prepended to every model call.
pub const SYSTEM_PROMPT: &str = "You are a smart assistant that can help user with their questions.";

pub const NEWS_RETRIEVER_DESCRIPTION: &str = "Tool that retrieves news, articles, and research reports";

pub const ARG_QUERY_DESCRIPTION: &str = "This query will be used in a search engine to find the most relevant news for user, \
so please generate a good search query based on user query.";

pub const ARG_ENTITIES_DESCRIPTION: &str = "all entities that mentioned in user query. If no specific entities mentioned, return empty list.\n\
Example: \"will deepseek affect nvdia stock price?\" -> [\"deepseek\", \"nvdia\"]; \
\"competition between AMD and Nvidia\" -> [\"AMD\", \"Nvidia\"]";

pub const RESPOND_DIRECTLY_DESCRIPTION: &str =
    "Tool for chatting with user. This tool cannot be used with other tools.";

pub const ARG_RESPONSE_DESCRIPTION: &str = "response for user";
