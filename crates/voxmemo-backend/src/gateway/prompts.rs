pub(crate) const TRANSCRIPTION: &str = "\
TRANSCRIPTION INSTRUCTIONS:
1. Transcribe all speech verbatim
2. Include filler words (um, uh), repetitions
3. Mark unclear parts with [?]
4. Return raw text only, no formatting
5. Never summarize or omit content";

pub(crate) const SHORT_AUDIO_FALLBACK: &str = "\
CRITICAL INSTRUCTIONS:
- This is a SHORT audio clip (1-15 seconds)
- Return EVERY detected sound
- Include even partial words
- Mark uncertain parts with [?]
- DO NOT filter anything";

pub(crate) fn translation(text: &str, language: &str) -> String {
    format!(
        "Translate the following text to {language}. Return only the translated text without any additional formatting or explanations:\n\n{text}"
    )
}

pub(crate) fn summary(text: &str) -> String {
    format!(
        "Provide a concise summary of the following text. Keep it brief and capture the main points:\n\n{text}"
    )
}

pub(crate) fn title(transcription: &str) -> String {
    format!(
        "Generate a short, descriptive title (2-4 words) for this voice memo based on its content. Return only the title:\n\n{transcription}"
    )
}
