//! Retrieval-augmented prompt template.
//!
//! The prompt restricts the model to the retrieved rows and names the exact
//! sentence to reply with when the rows do not contain the answer.

use crate::models::Document;

/// Reply the model is told to give, verbatim, when the context is insufficient.
pub const FALLBACK_ANSWER: &str = "I don't know — the dataset doesn't contain that information.";

/// Instruction block that opens every prompt.
pub fn system_instruction() -> String {
    format!(
        "You are an assistant that answers business questions using ONLY the provided source documents.\n\
         Each answer MUST be directly supported by the content in the retrieved documents. \
         If the required information is not present in the documents, say exactly: \"{}\"\n\
         Do NOT invent, infer beyond what's shown, or use external knowledge. \
         Be concise and, where helpful, list the source metadata (order_id, product, date, city).",
        FALLBACK_ANSWER
    )
}

/// Join document texts in retrieval order, separated by a blank line.
pub fn build_context<'a, I>(documents: I) -> String
where
    I: IntoIterator<Item = &'a Document>,
{
    documents
        .into_iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Fill the template with the question and the assembled context.
pub fn fill_prompt(question: &str, context: &str) -> String {
    format!(
        "{system}\n\n\
         User question: {question}\n\n\
         Context from the retrieved documents:\n\
         {context}\n\n\
         Answer using the retrieved documents. Provide a short answer (1-3 sentences) and, \
         if numeric, provide the numeric result and the supporting rows (order_id, product, date, city).\n\
         If the answer requires aggregation (top-selling, sum, average), compute it ONLY from \
         the retrieved documents and show how you computed it.\n",
        system = system_instruction(),
        question = question,
        context = context,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;

    fn doc(text: &str) -> Document {
        Document {
            text: text.to_string(),
            metadata: DocumentMetadata {
                order_id: String::new(),
                product: String::new(),
                date: String::new(),
                manager: String::new(),
                city: String::new(),
                price: None,
                quantity: None,
                revenue: None,
            },
        }
    }

    #[test]
    fn prompt_contains_fallback_verbatim() {
        let prompt = fill_prompt("Who is the CEO?", "");
        assert!(prompt.contains(FALLBACK_ANSWER));
        assert!(prompt.contains(
            "say exactly: \"I don't know — the dataset doesn't contain that information.\""
        ));
    }

    #[test]
    fn prompt_places_question_before_context() {
        let prompt = fill_prompt("Top product?", "Product: Widget");
        let q = prompt.find("User question: Top product?").unwrap();
        let c = prompt.find("Product: Widget").unwrap();
        assert!(q < c);
        assert!(prompt.starts_with("You are an assistant"));
    }

    #[test]
    fn context_keeps_retrieval_order() {
        let docs = [doc("first"), doc("second"), doc("third")];
        assert_eq!(build_context(&docs), "first\n\nsecond\n\nthird");
        assert_eq!(build_context(std::iter::empty::<&Document>()), "");
    }
}
