mod api_documents;
mod content_filter;
