use crate::db::models::NewWord;
use crate::db::{Storage, StoreError};

struct SampleWord {
    word: &'static str,
    translation: &'static str,
    category: &'static str,
    dictionary: &'static str,
    language: &'static str,
}

const fn sample(
    word: &'static str,
    translation: &'static str,
    category: &'static str,
    dictionary: &'static str,
    language: &'static str,
) -> SampleWord {
    SampleWord {
        word,
        translation,
        category,
        dictionary,
        language,
    }
}

const SAMPLE_WORDS: &[SampleWord] = &[
    sample("Bonjour", "Hello", "Greetings", "Collins", "French"),
    sample("Au revoir", "Goodbye", "Greetings", "Collins", "French"),
    sample("Merci", "Thank you", "Greetings", "Collins", "French"),
    sample("S'il vous plaît", "Please", "Greetings", "Collins", "French"),
    sample("Excusez-moi", "Excuse me", "Greetings", "Collins", "French"),
    sample("Pain", "Bread", "Food", "Collins", "French"),
    sample("Eau", "Water", "Food", "Collins", "French"),
    sample("Fromage", "Cheese", "Food", "Collins", "French"),
    sample("Viande", "Meat", "Food", "Collins", "French"),
    sample("Légume", "Vegetable", "Food", "Collins", "French"),
    sample("Rouge", "Red", "Colors", "Collins", "French"),
    sample("Bleu", "Blue", "Colors", "Collins", "French"),
    sample("Vert", "Green", "Colors", "Collins", "French"),
    sample("Jaune", "Yellow", "Colors", "Collins", "French"),
    sample("Noir", "Black", "Colors", "Collins", "French"),
    sample("Hola", "Hello", "Greetings", "Oxford", "Spanish"),
    sample("Adiós", "Goodbye", "Greetings", "Oxford", "Spanish"),
    sample("Gracias", "Thank you", "Greetings", "Oxford", "Spanish"),
    sample("Por favor", "Please", "Greetings", "Oxford", "Spanish"),
    sample("Lo siento", "Sorry", "Greetings", "Oxford", "Spanish"),
    sample("Casa", "House", "Home", "Oxford", "Spanish"),
    sample("Puerta", "Door", "Home", "Oxford", "Spanish"),
    sample("Ventana", "Window", "Home", "Oxford", "Spanish"),
    sample("Mesa", "Table", "Home", "Oxford", "Spanish"),
    sample("Silla", "Chair", "Home", "Oxford", "Spanish"),
    sample("Perro", "Dog", "Animals", "Oxford", "Spanish"),
    sample("Gato", "Cat", "Animals", "Oxford", "Spanish"),
    sample("Pájaro", "Bird", "Animals", "Oxford", "Spanish"),
    sample("Pez", "Fish", "Animals", "Oxford", "Spanish"),
    sample("Caballo", "Horse", "Animals", "Oxford", "Spanish"),
];

/// Loads the sample vocabulary into an empty store. Returns how many words
/// were inserted; a store that already holds words is left untouched.
pub async fn seed_sample_words(storage: &dyn Storage) -> Result<usize, StoreError> {
    if storage.word_count().await? > 0 {
        tracing::debug!("word store already seeded");
        return Ok(0);
    }

    for entry in SAMPLE_WORDS {
        storage
            .create_word(NewWord {
                word: entry.word.to_string(),
                translation: entry.translation.to_string(),
                category: entry.category.to_string(),
                dictionary: entry.dictionary.to_string(),
                language: entry.language.to_string(),
            })
            .await?;
    }

    tracing::info!(count = SAMPLE_WORDS.len(), "seeded sample words");
    Ok(SAMPLE_WORDS.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::models::TagField;

    #[tokio::test]
    async fn seeds_only_an_empty_store() {
        let store = MemoryStore::new();
        assert_eq!(seed_sample_words(&store).await.unwrap(), 30);
        assert_eq!(seed_sample_words(&store).await.unwrap(), 0);
        assert_eq!(store.word_count().await.unwrap(), 30);

        let dictionaries = store.distinct_values(TagField::Dictionary).await.unwrap();
        assert_eq!(dictionaries, vec!["Collins".to_string(), "Oxford".to_string()]);
    }
}
