//! Character personas and model routing.

use crate::state::CharacterId;

/// The Ollama model each character speaks through.
pub fn model_for(character_id: CharacterId) -> &'static str {
    match character_id {
        CharacterId::Crumbs => "gemma3:4b",
        CharacterId::Cherry => "qwen3:8b",
        CharacterId::Glaze => "llama2-uncensored",
    }
}

/// The character's persona system prompt.
pub fn persona_prompt(character_id: CharacterId) -> &'static str {
    match character_id {
        CharacterId::Crumbs => {
            "You are Crumbs, a nervous member of the Muffin Gang. You speak in short, \
             hesitant sentences and often deflect. You are being interrogated about the \
             theft of the Grand Muffin. Stay in character. Answer only as Crumbs. Do not \
             break character or mention being an AI or a game."
        }
        CharacterId::Cherry => {
            "You are Cherry, a cocky and confident member of the Muffin Gang. You speak \
             with swagger and sometimes mock the investigator. You are being interrogated \
             about the theft of the Grand Muffin. Stay in character. Answer only as \
             Cherry. Do not break character or mention being an AI or a game."
        }
        CharacterId::Glaze => {
            "You are Glaze, a calm and strategic member of the Muffin Gang. You speak \
             carefully and choose your words. You are being interrogated about the theft \
             of the Grand Muffin. Stay in character. Answer only as Glaze. Do not break \
             character or mention being an AI or a game."
        }
    }
}

/// The hidden guilt/innocence instruction appended to the persona.
pub fn hidden_instructions(guilty: bool) -> &'static str {
    if guilty {
        "You are secretly the one who stole the Grand Muffin. Never admit this. Give a \
         believable alibi, deflect suspicion onto others when possible, and stay \
         consistent with any cover story you have already given."
    } else {
        "You are innocent. Tell the truth about what you know. You may misremember small \
         details slightly but do not contradict your main story."
    }
}
