//! Tests for message conversion

use super::*;
use converse_bridge_core::chat::ImageFormat;

fn claude() -> ModelProfile {
    ModelProfile::for_model("anthropic.claude-3-5-sonnet-20240620-v1:0")
}

fn llama() -> ModelProfile {
    ModelProfile::for_model("meta.llama3-1-70b-instruct-v1:0")
}

fn convert(profile: &ModelProfile, messages: &[ChatMessage]) -> ConvertedMessages {
    let names = ToolNameMap::new();
    MessageConverter::new(profile, &names).convert(messages)
}

fn to_json(messages: &[Message]) -> Value {
    serde_json::to_value(messages).unwrap()
}

#[test]
fn test_text_only() {
    let out = convert(&claude(), &[ChatMessage::user("hi")]);
    assert_eq!(
        to_json(&out.messages),
        json!([{"role": "user", "content": [{"text": "hi"}]}])
    );
    assert!(out.system.is_empty());
}

#[test]
fn test_tool_round_trip() {
    let messages = vec![
        ChatMessage::new(
            ChatRole::Assistant,
            vec![ContentPart::tool_call("c1", "search", json!({"q": "x"}))],
        ),
        ChatMessage::new(ChatRole::User, vec![ContentPart::tool_result("c1", "ok")]),
    ];

    let out = convert(&claude(), &messages);
    assert_eq!(
        to_json(&out.messages),
        json!([
            {"role": "assistant", "content": [
                {"toolUse": {"toolUseId": "c1", "name": "search", "input": {"q": "x"}}}
            ]},
            {"role": "user", "content": [
                {"toolResult": {"toolUseId": "c1", "content": [{"text": "ok"}]}}
            ]}
        ])
    );
}

#[test]
fn test_system_messages_become_system_blocks() {
    let messages = vec![
        ChatMessage::system("You are terse."),
        ChatMessage::new(
            ChatRole::System,
            vec![ContentPart::text("Answer in "), ContentPart::text("French.")],
        ),
        ChatMessage::user("hello"),
    ];

    let out = convert(&claude(), &messages);
    assert_eq!(
        out.system,
        vec![
            SystemContentBlock {
                text: "You are terse.".to_string()
            },
            SystemContentBlock {
                text: "Answer in French.".to_string()
            },
        ]
    );
    assert_eq!(out.messages.len(), 1);
}

#[test]
fn test_assistant_block_order() {
    let messages = vec![
        ChatMessage::user("draw and search"),
        ChatMessage::new(
            ChatRole::Assistant,
            vec![
                ContentPart::tool_call("c1", "search", json!({"q": "cats"})),
                ContentPart::text("Let me "),
                ContentPart::Image {
                    format: ImageFormat::Png,
                    data: vec![1, 2, 3],
                },
                ContentPart::text("look."),
            ],
        ),
        ChatMessage::new(ChatRole::User, vec![ContentPart::tool_result("c1", "found")]),
    ];

    let out = convert(&claude(), &messages);
    let assistant = &out.messages[1];
    assert_eq!(assistant.role, ConversationRole::Assistant);
    assert!(matches!(&assistant.content[0], ContentBlock::Text(t) if t == "Let me look."));
    assert!(matches!(&assistant.content[1], ContentBlock::Image(_)));
    assert!(matches!(&assistant.content[2], ContentBlock::ToolUse(_)));
}

#[test]
fn test_consecutive_result_messages_merge_into_one_user_message() {
    let messages = vec![
        ChatMessage::user("go"),
        ChatMessage::new(
            ChatRole::Assistant,
            vec![
                ContentPart::tool_call("a", "search", json!({})),
                ContentPart::tool_call("b", "search", json!({})),
            ],
        ),
        ChatMessage::new(ChatRole::User, vec![ContentPart::tool_result("a", "1")]),
        ChatMessage::new(ChatRole::User, vec![ContentPart::tool_result("b", "2")]),
        ChatMessage::assistant("done"),
    ];

    let out = convert(&llama(), &messages);
    assert_eq!(out.messages.len(), 4);

    let results = &out.messages[2];
    assert_eq!(results.role, ConversationRole::User);
    let ids: Vec<_> = results
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolResult(r) => Some(r.tool_use_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(out.messages[3].role, ConversationRole::Assistant);
}

#[test]
fn test_results_flush_at_end_of_list() {
    let messages = vec![
        ChatMessage::user("go"),
        ChatMessage::new(
            ChatRole::Assistant,
            vec![ContentPart::tool_call("a", "search", json!({}))],
        ),
        ChatMessage::new(ChatRole::User, vec![ContentPart::tool_result("a", "1")]),
    ];

    let out = convert(&llama(), &messages);
    assert_eq!(out.messages.len(), 3);
    assert!(matches!(
        &out.messages[2].content[0],
        ContentBlock::ToolResult(r) if r.tool_use_id == "a"
    ));
}

#[test]
fn test_following_user_text_flushes_results_separately() {
    let messages = vec![
        ChatMessage::user("go"),
        ChatMessage::new(
            ChatRole::Assistant,
            vec![ContentPart::tool_call("a", "search", json!({}))],
        ),
        ChatMessage::new(ChatRole::User, vec![ContentPart::tool_result("a", "1")]),
        ChatMessage::user("now summarize"),
    ];

    let out = convert(&claude(), &messages);
    assert_eq!(out.messages.len(), 4);

    let results = &out.messages[2];
    assert_eq!(results.role, ConversationRole::User);
    assert_eq!(results.content.len(), 1);
    assert!(matches!(
        &results.content[0],
        ContentBlock::ToolResult(r) if r.tool_use_id == "a"
    ));

    let text = &out.messages[3];
    assert_eq!(text.role, ConversationRole::User);
    assert_eq!(
        text.content,
        vec![ContentBlock::Text("now summarize".to_string())]
    );
}

#[test]
fn test_mixed_user_message_joins_open_batch() {
    let messages = vec![
        ChatMessage::user("go"),
        ChatMessage::new(
            ChatRole::Assistant,
            vec![
                ContentPart::tool_call("a", "search", json!({})),
                ContentPart::tool_call("b", "search", json!({})),
            ],
        ),
        ChatMessage::new(ChatRole::User, vec![ContentPart::tool_result("a", "1")]),
        ChatMessage::new(
            ChatRole::User,
            vec![ContentPart::tool_result("b", "2"), ContentPart::text("done")],
        ),
    ];

    let out = convert(&llama(), &messages);
    assert_eq!(out.messages.len(), 3);
    let last = &out.messages[2];
    assert_eq!(last.content.len(), 3);
    assert!(matches!(&last.content[0], ContentBlock::ToolResult(r) if r.tool_use_id == "a"));
    assert!(matches!(&last.content[1], ContentBlock::ToolResult(r) if r.tool_use_id == "b"));
    assert!(matches!(&last.content[2], ContentBlock::Text(t) if t == "done"));
}

#[test]
fn test_mixed_user_message_keeps_results_first() {
    let messages = vec![
        ChatMessage::user("go"),
        ChatMessage::new(
            ChatRole::Assistant,
            vec![ContentPart::tool_call("a", "search", json!({}))],
        ),
        ChatMessage::new(
            ChatRole::User,
            vec![ContentPart::tool_result("a", "1"), ContentPart::text("thanks")],
        ),
    ];

    let out = convert(&llama(), &messages);
    assert_eq!(out.messages.len(), 3);
    assert!(matches!(&out.messages[2].content[0], ContentBlock::ToolResult(_)));
    assert!(matches!(&out.messages[2].content[1], ContentBlock::Text(_)));
}

#[test]
fn test_result_ids_trace_back_to_preceding_assistant() {
    let messages = vec![
        ChatMessage::user("go"),
        ChatMessage::new(
            ChatRole::Assistant,
            vec![
                ContentPart::tool_call("x1", "search", json!({})),
                ContentPart::tool_call("x2", "search", json!({})),
            ],
        ),
        ChatMessage::new(
            ChatRole::User,
            vec![ContentPart::tool_result("x2", "b"), ContentPart::tool_result("x1", "a")],
        ),
        ChatMessage::new(
            ChatRole::Assistant,
            vec![ContentPart::tool_call("y1", "search", json!({}))],
        ),
        ChatMessage::new(ChatRole::User, vec![ContentPart::tool_result("y1", "c")]),
    ];

    let out = convert(&claude(), &messages);
    for (i, message) in out.messages.iter().enumerate() {
        for block in &message.content {
            if let ContentBlock::ToolResult(result) = block {
                let previous = &out.messages[i - 1];
                assert_eq!(previous.role, ConversationRole::Assistant);
                assert!(previous.content.iter().any(|b| matches!(
                    b,
                    ContentBlock::ToolUse(u) if u.tool_use_id == result.tool_use_id
                )));
            }
        }
    }
}

#[test]
fn test_json_profile_structures_results() {
    let messages = vec![
        ChatMessage::user("go"),
        ChatMessage::new(
            ChatRole::Assistant,
            vec![
                ContentPart::tool_call("a", "f", json!({})),
                ContentPart::tool_call("b", "f", json!({})),
                ContentPart::tool_call("c", "f", json!({})),
            ],
        ),
        ChatMessage::new(
            ChatRole::User,
            vec![
                ContentPart::ToolResult {
                    call_id: "a".to_string(),
                    content: vec!["{\"temp\":".to_string(), "21}".to_string()],
                    is_error: false,
                },
                ContentPart::tool_result("b", "42"),
                ContentPart::tool_result("c", "not json"),
            ],
        ),
    ];

    let out = convert(&claude(), &messages);
    assert_eq!(
        to_json(&out.messages[2..]),
        json!([{"role": "user", "content": [
            {"toolResult": {"toolUseId": "a", "content": [{"json": {"temp": 21}}]}},
            {"toolResult": {"toolUseId": "b", "content": [{"json": {"result": 42}}]}},
            {"toolResult": {"toolUseId": "c", "content": [{"text": "not json"}]}}
        ]}])
    );
}

#[test]
fn test_text_profile_keeps_json_as_text() {
    let messages = vec![
        ChatMessage::user("go"),
        ChatMessage::new(
            ChatRole::Assistant,
            vec![ContentPart::tool_call("a", "f", json!({}))],
        ),
        ChatMessage::new(
            ChatRole::User,
            vec![ContentPart::tool_result("a", "{\"temp\":21}")],
        ),
    ];

    let out = convert(&llama(), &messages);
    assert!(matches!(
        &out.messages[2].content[0],
        ContentBlock::ToolResult(r) if r.content == vec![ToolResultContentBlock::Text("{\"temp\":21}".to_string())]
    ));
}

#[test]
fn test_error_status_depends_on_profile() {
    let messages = vec![
        ChatMessage::user("go"),
        ChatMessage::new(
            ChatRole::Assistant,
            vec![ContentPart::tool_call("a", "f", json!({}))],
        ),
        ChatMessage::new(
            ChatRole::User,
            vec![ContentPart::ToolResult {
                call_id: "a".to_string(),
                content: vec!["boom".to_string()],
                is_error: true,
            }],
        ),
    ];

    let status_of = |out: &ConvertedMessages| match &out.messages[2].content[0] {
        ContentBlock::ToolResult(r) => r.status,
        other => panic!("unexpected block: {:?}", other),
    };

    assert_eq!(
        status_of(&convert(&claude(), &messages)),
        Some(ToolResultStatus::Error)
    );
    assert_eq!(status_of(&convert(&llama(), &messages)), None);
}

#[test]
fn test_images_dropped_when_unsupported() {
    let messages = vec![ChatMessage::new(
        ChatRole::User,
        vec![
            ContentPart::text("what is this?"),
            ContentPart::Image {
                format: ImageFormat::Jpeg,
                data: vec![0xff, 0xd8],
            },
        ],
    )];

    let with_images = convert(&claude(), &messages);
    assert_eq!(
        to_json(&with_images.messages),
        json!([{"role": "user", "content": [
            {"text": "what is this?"},
            {"image": {"format": "jpeg", "source": {"bytes": "/9g="}}}
        ]}])
    );

    let profile = ModelProfile::for_model("cohere.command-r-v1:0");
    let without = convert(&profile, &messages);
    assert_eq!(without.messages[0].content.len(), 1);
}

#[test]
fn test_blank_messages_are_skipped() {
    let messages = vec![
        ChatMessage::user("hi"),
        ChatMessage::assistant("   "),
        ChatMessage::user("again"),
    ];
    let out = convert(&claude(), &messages);
    assert_eq!(out.messages.len(), 2);
}

#[test]
fn test_tool_names_are_mapped_to_wire_names() {
    let mut names = ToolNameMap::new();
    names.insert("1lookup", "tool_1lookup");

    let messages = vec![
        ChatMessage::user("go"),
        ChatMessage::new(
            ChatRole::Assistant,
            vec![ContentPart::tool_call("a", "1lookup", Value::Null)],
        ),
        ChatMessage::new(ChatRole::User, vec![ContentPart::tool_result("a", "ok")]),
    ];

    let profile = claude();
    let out = MessageConverter::new(&profile, &names).convert(&messages);
    match &out.messages[1].content[0] {
        ContentBlock::ToolUse(tool_use) => {
            assert_eq!(tool_use.name, "tool_1lookup");
            assert_eq!(tool_use.input, json!({}));
        }
        other => panic!("unexpected block: {:?}", other),
    }
}
