mod agent_retry;
mod smoke_tests;

// This file organizes the integration tests into a cohesive test suite.
// Each module tests a specific aspect of the application:
// - smoke_tests: Basic functionality tests to ensure nothing is broken
// - tool_layer: The four calendar tools over in-memory doubles
// - agent_retry: The agent loop's retry protocol against a scripted model
